//! Widget-toolkit classification and component-type mapping.
//!
//! Elements are classified as plain HTML, Dojo (dijit) widgets or SAP
//! OpenUI5 controls. The fast path only inspects attributes; the thorough
//! path asks the page's toolkit runtime through a bounded script.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::driver::{Driver, ScriptArg};
use crate::errors::LocatorError;
use crate::script::ScriptExecutor;

/// UI component convention an element follows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Domain {
    #[default]
    Html,
    Dojo,
    Sap,
}

impl Domain {
    pub fn is_toolkit(&self) -> bool {
        !matches!(self, Domain::Html)
    }

    /// Split a `DOJO`/`SAP` prefix off a requested type such as `SAPTree`
    /// or `DOJO.Button`. A dot after the prefix is dropped with it.
    pub fn strip_type_prefix(type_name: &str) -> (Option<Domain>, &str) {
        let trimmed = type_name.trim();
        let upper = trimmed.to_ascii_uppercase();
        let (domain, rest) = if upper.starts_with("DOJO") {
            (Some(Domain::Dojo), &trimmed[4..])
        } else if upper.starts_with("SAP") {
            (Some(Domain::Sap), &trimmed[3..])
        } else {
            return (None, trimmed);
        };
        (domain, rest.strip_prefix('.').unwrap_or(rest))
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Html => "Html",
            Domain::Dojo => "Dojo",
            Domain::Sap => "Sap",
        };
        write!(f, "{}", name)
    }
}

/// Component types the resolver knows about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ComponentType {
    Component,
    Button,
    CheckBox,
    RadioButton,
    EditBox,
    ComboBox,
    ListView,
    TabControl,
    Menu,
    MenuBar,
    Tree,
    Table,
    Link,
    Image,
    /// A type named only in configuration
    Other(String),
}

impl ComponentType {
    /// Type whose sub-item matcher handles this component
    pub fn library_type(&self) -> ComponentType {
        match self {
            ComponentType::MenuBar => ComponentType::Menu,
            other => other.clone(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ComponentType::Component => "Component",
            ComponentType::Button => "Button",
            ComponentType::CheckBox => "CheckBox",
            ComponentType::RadioButton => "RadioButton",
            ComponentType::EditBox => "EditBox",
            ComponentType::ComboBox => "ComboBox",
            ComponentType::ListView => "ListView",
            ComponentType::TabControl => "TabControl",
            ComponentType::Menu => "Menu",
            ComponentType::MenuBar => "MenuBar",
            ComponentType::Tree => "Tree",
            ComponentType::Table => "Table",
            ComponentType::Link => "Link",
            ComponentType::Image => "Image",
            ComponentType::Other(name) => name,
        }
    }
}

impl FromStr for ComponentType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = match s.trim().to_ascii_lowercase().as_str() {
            "component" => ComponentType::Component,
            "button" => ComponentType::Button,
            "checkbox" => ComponentType::CheckBox,
            "radiobutton" => ComponentType::RadioButton,
            "editbox" => ComponentType::EditBox,
            "combobox" => ComponentType::ComboBox,
            "listview" | "list" => ComponentType::ListView,
            "tabcontrol" => ComponentType::TabControl,
            "menu" => ComponentType::Menu,
            "menubar" => ComponentType::MenuBar,
            "tree" => ComponentType::Tree,
            "table" => ComponentType::Table,
            "link" => ComponentType::Link,
            "image" => ComponentType::Image,
            _ => ComponentType::Other(s.trim().to_string()),
        };
        Ok(t)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

lazy_static! {
    /// Built-in class name to component type table, keys lowercase
    static ref CLASS_TYPES: HashMap<&'static str, ComponentType> = {
        use ComponentType::*;
        let mut m = HashMap::new();
        // Dojo widgets
        m.insert("dijit.form.button", Button);
        m.insert("dijit.form.togglebutton", Button);
        m.insert("dijit.form.checkbox", CheckBox);
        m.insert("dijit.form.radiobutton", RadioButton);
        m.insert("dijit.form.textbox", EditBox);
        m.insert("dijit.form.validationtextbox", EditBox);
        m.insert("dijit.form.combobox", ComboBox);
        m.insert("dijit.form.filteringselect", ComboBox);
        m.insert("dijit.form.select", ComboBox);
        m.insert("dijit.form.multiselect", ListView);
        m.insert("dijit.layout.tabcontainer", TabControl);
        m.insert("dijit.menu", Menu);
        m.insert("dijit.dropdownmenu", Menu);
        m.insert("dijit.menubar", MenuBar);
        m.insert("dijit.tree", Tree);
        // SAP OpenUI5 controls
        m.insert("sap.m.button", Button);
        m.insert("sap.ui.commons.button", Button);
        m.insert("sap.m.checkbox", CheckBox);
        m.insert("sap.ui.commons.checkbox", CheckBox);
        m.insert("sap.m.radiobutton", RadioButton);
        m.insert("sap.m.input", EditBox);
        m.insert("sap.ui.commons.textfield", EditBox);
        m.insert("sap.m.combobox", ComboBox);
        m.insert("sap.m.select", ComboBox);
        m.insert("sap.ui.commons.combobox", ComboBox);
        m.insert("sap.ui.commons.dropdownbox", ComboBox);
        m.insert("sap.m.list", ListView);
        m.insert("sap.ui.commons.listbox", ListView);
        m.insert("sap.m.icontabbar", TabControl);
        m.insert("sap.ui.commons.tabstrip", TabControl);
        m.insert("sap.ui.unified.menu", Menu);
        m.insert("sap.ui.commons.menu", Menu);
        m.insert("sap.ui.commons.menubar", MenuBar);
        m.insert("sap.m.tree", Tree);
        m.insert("sap.ui.commons.tree", Tree);
        m.insert("sap.ui.table.table", Table);
        m.insert("sap.m.table", Table);
        // HTML tags and input types
        m.insert("button", Button);
        m.insert("submit", Button);
        m.insert("reset", Button);
        m.insert("checkbox", CheckBox);
        m.insert("radio", RadioButton);
        m.insert("text", EditBox);
        m.insert("password", EditBox);
        m.insert("email", EditBox);
        m.insert("textarea", EditBox);
        m.insert("input", EditBox);
        m.insert("select", ComboBox);
        m.insert("ul", ListView);
        m.insert("ol", ListView);
        m.insert("table", Table);
        m.insert("a", Link);
        m.insert("img", Image);
        m
    };
}

/// Reports the toolkit class of an element and its superclasses.
/// Entry 0 names the domain: `dojo`, `sap` or `html`.
pub const NATIVE_CLASS_SCRIPT: &str = r#"
var el = arguments[0];
try {
    if (window.dijit && dijit.byId && el.id) {
        var w = dijit.byId(el.id) || (dijit.getEnclosingWidget && dijit.getEnclosingWidget(el));
        if (w && window.dijit._WidgetBase && w instanceof dijit._WidgetBase) {
            var out = ['dojo', w.declaredClass];
            var p = w.constructor && w.constructor._meta ? w.constructor._meta.bases : [];
            for (var i = 1; i < p.length; i++) { if (p[i].prototype.declaredClass) out.push(p[i].prototype.declaredClass); }
            return out;
        }
    }
    if (window.sap && sap.ui && sap.ui.getCore && el.id) {
        var c = sap.ui.getCore().byId(el.id);
        if (c && c instanceof sap.ui.core.Control) {
            var out = ['sap'];
            var m = c.getMetadata();
            while (m) { out.push(m.getName()); m = m.getParent ? m.getParent() : null; }
            return out;
        }
    }
} catch (e) {}
return ['html'];
"#;

/// Maps class names to component types
#[derive(Debug, Clone, Default)]
pub struct TypeMapper {
    extra: HashMap<String, ComponentType>,
}

impl TypeMapper {
    /// Built-in table extended by `class_types` entries
    pub fn new(class_types: &HashMap<String, String>) -> Self {
        let extra = class_types
            .iter()
            .map(|(class, ty)| {
                let ty = ComponentType::from_str(ty).unwrap_or(ComponentType::Component);
                (class.to_ascii_lowercase(), ty)
            })
            .collect();
        TypeMapper { extra }
    }

    pub fn lookup(&self, class_name: &str) -> Option<ComponentType> {
        let key = class_name.trim().to_ascii_lowercase();
        self.extra
            .get(&key)
            .or_else(|| CLASS_TYPES.get(key.as_str()))
            .cloned()
    }

    /// `cssClass`, input `type`, then tag
    pub async fn html_class_names<D: Driver>(
        &self,
        driver: &D,
        element: &D::Element,
    ) -> Result<Vec<String>, LocatorError> {
        let mut names = Vec::new();
        if let Some(class) = driver.attribute(element, "class").await? {
            names.extend(class.split_whitespace().map(str::to_string));
        }
        if let Some(input_type) = driver.attribute(element, "type").await? {
            names.push(input_type);
        }
        names.push(driver.tag_name(element).await?);
        Ok(names)
    }

    /// First mapped type among `names`
    pub fn first_mapped<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> Option<ComponentType> {
        names.into_iter().find_map(|n| self.lookup(n))
    }
}

/// Classify from attributes only
pub async fn classify<D: Driver>(driver: &D, element: &D::Element) -> Result<Domain, LocatorError> {
    let class = driver.attribute(element, "class").await?.unwrap_or_default();
    let tokens: Vec<&str> = class.split_whitespace().collect();

    if tokens.iter().any(|t| t.starts_with("sap")) {
        return Ok(Domain::Sap);
    }
    if tokens.iter().any(|t| t.starts_with("dijit"))
        && driver.attribute(element, "widgetid").await?.is_some()
    {
        return Ok(Domain::Dojo);
    }
    Ok(Domain::Html)
}

/// Toolkit class chain reported by the page, with the detected domain
pub async fn native_class_names<D: Driver>(
    executor: &ScriptExecutor<D>,
    element: &D::Element,
) -> Result<(Domain, Vec<String>), LocatorError> {
    let value = executor
        .execute(NATIVE_CLASS_SCRIPT, vec![ScriptArg::Element(element.clone())])
        .await?;
    let mut names: Vec<String> = match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    if names.is_empty() {
        return Ok((Domain::Html, names));
    }
    let domain = match names.remove(0).as_str() {
        "dojo" => Domain::Dojo,
        "sap" => Domain::Sap,
        _ => Domain::Html,
    };
    Ok((domain, names))
}

/// Classify from attributes, asking the toolkit runtime when they are silent
pub async fn classify_thorough<D: Driver>(
    executor: &ScriptExecutor<D>,
    element: &D::Element,
) -> Result<Domain, LocatorError> {
    let fast = classify(executor.driver().as_ref(), element).await?;
    if fast.is_toolkit() {
        return Ok(fast);
    }
    match native_class_names(executor, element).await {
        Ok((domain, _)) => Ok(domain),
        Err(LocatorError::Timeout(msg)) => {
            debug!("Toolkit probe timed out, treating element as HTML: {}", msg);
            Ok(Domain::Html)
        }
        Err(e) => Err(e),
    }
}

/// Resolves component types and checks type filters
pub struct TypeResolver<'a, D: Driver> {
    pub executor: &'a ScriptExecutor<D>,
    pub mapper: &'a TypeMapper,
}

impl<D: Driver> TypeResolver<'_, D> {
    /// Toolkit classes first, then HTML class names. Defaults to `Component`.
    pub async fn component_type(&self, element: &D::Element) -> Result<ComponentType, LocatorError> {
        let driver = self.executor.driver().as_ref();
        let domain = classify(driver, element).await?;
        if domain.is_toolkit() {
            let (_, natives) = self.native_names(element).await;
            if let Some(t) = self.mapper.first_mapped(&natives) {
                return Ok(t);
            }
        }
        let html = self.mapper.html_class_names(driver, element).await?;
        Ok(self.mapper.first_mapped(&html).unwrap_or(ComponentType::Component))
    }

    async fn native_names(&self, element: &D::Element) -> (Domain, Vec<String>) {
        match native_class_names(self.executor, element).await {
            Ok(found) => found,
            Err(e) => {
                debug!("Could not read toolkit class names: {}", e);
                (Domain::Html, Vec::new())
            }
        }
    }

    /// Whether `element` is of `type_name`, which may carry a toolkit prefix
    pub async fn is_type_matched(&self, element: &D::Element, type_name: &str) -> Result<bool, LocatorError> {
        let (_, bare) = Domain::strip_type_prefix(type_name);
        let wanted = ComponentType::from_str(bare).unwrap_or(ComponentType::Component);

        let actual = self.component_type(element).await?;
        if actual == wanted || actual.as_str().eq_ignore_ascii_case(bare) {
            return Ok(true);
        }

        let driver = self.executor.driver().as_ref();
        let html = self.mapper.html_class_names(driver, element).await?;
        Ok(html
            .iter()
            .filter_map(|n| self.mapper.lookup(n))
            .any(|t| t == wanted))
    }
}

#[cfg(test)]
#[path = "domain_test.rs"]
mod domain_test;
