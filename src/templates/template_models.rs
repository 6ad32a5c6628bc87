use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Litigation,
    Contract,
    Family,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Litigation, Category::Contract, Category::Family];

    pub fn id(&self) -> &'static str {
        match self {
            Category::Litigation => "litigation",
            Category::Contract => "contract",
            Category::Family => "family",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Litigation => "诉讼类",
            Category::Contract => "合同类",
            Category::Family => "身份/家事类",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Category::Litigation => "起诉状、答辩状等",
            Category::Contract => "借款、租赁等合同",
            Category::Family => "离婚协议等",
        }
    }

    pub fn parse(id: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.id() == id)
    }
}

/// Category entry as exposed to the selection screen.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryInfo {
    pub id: Category,
    pub label: &'static str,
    pub description: &'static str,
}

pub fn categories() -> Vec<CategoryInfo> {
    Category::ALL
        .into_iter()
        .map(|id| CategoryInfo {
            id,
            label: id.label(),
            description: id.description(),
        })
        .collect()
}

/// Input widget kind. Select carries its fixed option list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Select { options: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub required: bool,
    pub placeholder: String,
}

impl FormField {
    pub fn text(name: &str, label: &str, required: bool, placeholder: &str) -> Self {
        Self::with_kind(name, label, FieldKind::Text, required, placeholder)
    }

    pub fn textarea(name: &str, label: &str, required: bool, placeholder: &str) -> Self {
        Self::with_kind(name, label, FieldKind::Textarea, required, placeholder)
    }

    pub fn select(name: &str, label: &str, required: bool, options: &[&str]) -> Self {
        let options = options.iter().map(|o| o.to_string()).collect();
        Self::with_kind(name, label, FieldKind::Select { options }, required, "")
    }

    fn with_kind(name: &str, label: &str, kind: FieldKind, required: bool, placeholder: &str) -> Self {
        FormField {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            required,
            placeholder: placeholder.to_string(),
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match &self.kind {
            FieldKind::Select { options } => Some(options),
            FieldKind::Text | FieldKind::Textarea => None,
        }
    }

    /// Required and absent, or blank after trimming.
    pub fn is_missing_in(&self, form: &FormData) -> bool {
        self.required && form.get(&self.name).map_or(true, |v| v.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTemplate {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub category_label: String,
    pub description: String,
    pub fields: Vec<FormField>,
}

impl DocumentTemplate {
    pub fn new(id: &str, name: &str, category: Category, description: &str, fields: Vec<FormField>) -> Self {
        DocumentTemplate {
            id: id.to_string(),
            name: name.to_string(),
            category,
            category_label: category.label().to_string(),
            description: description.to_string(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_labels(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.label.clone())
            .collect()
    }

    /// Labels of required fields that are absent or blank, in field order.
    pub fn missing_labels(&self, form: &FormData) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.is_missing_in(form))
            .map(|f| f.label.clone())
            .collect()
    }

    fn matches_term(&self, term: &str) -> bool {
        self.name.contains(term) || self.description.contains(term) || self.category_label.contains(term)
    }

    pub(crate) fn matches(&self, category: Option<Category>, term: Option<&str>) -> bool {
        let category_ok = category.map_or(true, |c| c == self.category);
        let term_ok = match term.map(str::trim) {
            None | Some("") => true,
            Some(t) => self.matches_term(t),
        };
        category_ok && term_ok
    }
}

/// User input keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(BTreeMap<String, String>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        FormData(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
