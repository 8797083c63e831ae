use anyhow::Result;
use serde::Serialize;

use rsprobe::recognition::{Grammar, RecognitionString, Segment};
use rsprobe::types::OutputFormat;

#[derive(Debug, Serialize)]
pub struct ParseReport {
    pub recognition_string: String,
    pub has_frames: bool,
    pub segments: Vec<Segment>,
}

pub fn parse_report(recognition_string: &str, grammar: &Grammar) -> ParseReport {
    let parsed = RecognitionString::parse(recognition_string, grammar);
    ParseReport {
        recognition_string: recognition_string.to_string(),
        has_frames: parsed.has_frames(),
        segments: parsed.into_segments(),
    }
}

pub fn handle_parse(recognition_string: String, grammar: &Grammar, format: OutputFormat) -> Result<()> {
    let report = parse_report(&recognition_string, grammar);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Simple => {
            if report.segments.is_empty() {
                println!("(root element)");
            }
            for (i, segment) in report.segments.iter().enumerate() {
                let modes: Vec<_> = segment.prefixes.iter().map(|p| p.token()).collect();
                println!("[{}] {} {}", i, segment.raw, modes.join(""));
                for q in &segment.qualifiers {
                    println!("  {:?} {} = {}", q.kind(), q.name, q.value);
                }
            }
        }
    }
    Ok(())
}
