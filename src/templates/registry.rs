use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::core::CatalogError;
use crate::templates::catalog;
use crate::templates::template_models::{Category, DocumentTemplate, FieldKind, FormData};

/// Shown when a deep link names a template that does not exist.
pub const NOT_FOUND_MESSAGE: &str = "未找到该文书类型";

static BUILTIN: Lazy<TemplateRegistry> = Lazy::new(|| {
    TemplateRegistry::new(catalog::document_templates())
        .unwrap_or_else(|e| panic!("built-in catalog is inconsistent: {e}"))
});

/// Immutable catalog of document templates, kept in declaration order.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: Vec<DocumentTemplate>,
}

impl TemplateRegistry {
    /// Builds a registry after checking the catalog invariants.
    pub fn new(templates: Vec<DocumentTemplate>) -> Result<Self, CatalogError> {
        let mut ids = HashSet::new();

        for template in &templates {
            if !ids.insert(template.id.as_str()) {
                return Err(CatalogError::DuplicateTemplate(template.id.clone()));
            }

            let mut names = HashSet::new();
            for field in &template.fields {
                if !names.insert(field.name.as_str()) {
                    return Err(CatalogError::DuplicateField {
                        template: template.id.clone(),
                        field: field.name.clone(),
                    });
                }
                if let FieldKind::Select { options } = &field.kind {
                    if options.is_empty() {
                        return Err(CatalogError::EmptyOptions {
                            template: template.id.clone(),
                            field: field.name.clone(),
                        });
                    }
                }
            }
        }

        Ok(Self { templates })
    }

    /// The compiled-in catalog, built once per process.
    pub fn builtin() -> &'static TemplateRegistry {
        &BUILTIN
    }

    pub fn list(&self) -> &[DocumentTemplate] {
        &self.templates
    }

    pub fn find(&self, id: &str) -> Option<&DocumentTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Case-sensitive substring search over name, description and category
    /// label, optionally restricted to one category. The term is trimmed and
    /// a blank term matches everything. Order is preserved.
    pub fn filter(&self, category: Option<Category>, search: Option<&str>) -> Vec<&DocumentTemplate> {
        self.templates
            .iter()
            .filter(|t| t.matches(category, search))
            .collect()
    }

    /// Labels of required fields that are absent or blank. Never mutates
    /// the registry or the form.
    pub fn validate(&self, template: &DocumentTemplate, form: &FormData) -> Vec<String> {
        template.missing_labels(form)
    }
}
