use anyhow::Result;
use serde::Serialize;

use rsprobe::recognition::{Grammar, RecognitionString};
use rsprobe::types::OutputFormat;
use rsprobe::xpath::{CompiledQuery, compile_segment};

#[derive(Debug, Serialize)]
pub struct CompiledSegment {
    pub segment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<CompiledQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

/// Compile every segment; frame segments are reported, not compiled
pub fn compile_report(recognition_string: &str, grammar: &Grammar) -> Vec<CompiledSegment> {
    RecognitionString::parse(recognition_string, grammar)
        .segments()
        .iter()
        .map(|segment| {
            if let Some((key, qualifier)) = segment.frame_qualifier() {
                return CompiledSegment {
                    segment: segment.raw.clone(),
                    frame: Some(format!("{:?}={}", key, qualifier.value)),
                    query: None,
                    skipped: None,
                };
            }
            match compile_segment(segment, grammar) {
                Ok(query) => CompiledSegment {
                    segment: segment.raw.clone(),
                    frame: None,
                    query: Some(query),
                    skipped: None,
                },
                Err(e) => CompiledSegment {
                    segment: segment.raw.clone(),
                    frame: None,
                    query: None,
                    skipped: Some(e.to_string()),
                },
            }
        })
        .collect()
}

pub fn handle_compile(recognition_string: String, grammar: &Grammar, format: OutputFormat) -> Result<()> {
    let report = compile_report(&recognition_string, grammar);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Simple => {
            for entry in &report {
                match (&entry.frame, &entry.query, &entry.skipped) {
                    (Some(frame), _, _) => println!("{} -> frame {}", entry.segment, frame),
                    (_, Some(query), _) => {
                        println!("{} -> {}", entry.segment, query.locator);
                        if let Some(filter) = &query.text_filter {
                            println!("  text ladder: '{}' partial={}", filter.text, filter.partial);
                        }
                        if !query.post.is_empty() {
                            println!("  post: {:?}", query.post);
                        }
                    }
                    (_, _, Some(reason)) => println!("{} -> skipped: {}", entry.segment, reason),
                    _ => {}
                }
            }
        }
    }
    Ok(())
}
