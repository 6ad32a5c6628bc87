// Built-in document types, in the order they are offered to users.

mod contract;
mod family;
mod litigation;

use crate::templates::template_models::{DocumentTemplate, FormField};

pub fn document_templates() -> Vec<DocumentTemplate> {
    vec![
        litigation::civil_complaint(),
        litigation::defense_statement(),
        contract::loan_contract(),
        contract::rental_contract(),
        family::divorce_agreement(),
    ]
}

/// Name, ID number, address and phone for one party, keyed by `prefix`.
pub(crate) fn party_fields(prefix: &str, label: &str) -> Vec<FormField> {
    vec![
        FormField::text(
            &format!("{prefix}Name"),
            &format!("{label}姓名/名称"),
            true,
            &format!("请输入{label}姓名或单位名称"),
        ),
        FormField::text(
            &format!("{prefix}IdNumber"),
            &format!("{label}身份证号/统一社会信用代码"),
            false,
            "选填",
        ),
        FormField::text(
            &format!("{prefix}Address"),
            &format!("{label}住址"),
            true,
            &format!("请输入{label}住址"),
        ),
        FormField::text(&format!("{prefix}Phone"), &format!("{label}联系电话"), false, "选填"),
    ]
}
