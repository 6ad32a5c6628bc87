use super::party_fields;
use crate::templates::template_models::{Category, DocumentTemplate, FormField};

pub fn civil_complaint() -> DocumentTemplate {
    let mut fields = party_fields("plaintiff", "原告");
    fields.extend(party_fields("defendant", "被告"));
    fields.extend([
        FormField::textarea(
            "claims",
            "诉讼请求",
            true,
            "请逐条列明诉讼请求，如：1. 判令被告偿还借款本金XX元及利息；2. 本案诉讼费用由被告承担。",
        ),
        FormField::textarea("factsAndReasons", "事实与理由", true, "请详细描述案件事实经过及起诉理由"),
        FormField::text("court", "管辖法院", true, "如：北京市朝阳区人民法院"),
        FormField::textarea("evidence", "证据清单", false, "选填，如：1. 借条原件；2. 转账记录"),
    ]);

    DocumentTemplate::new(
        "civil-complaint",
        "民事起诉状",
        Category::Litigation,
        "用于向法院提起民事诉讼，主张合法权益",
        fields,
    )
}

pub fn defense_statement() -> DocumentTemplate {
    let mut fields = party_fields("defendant", "答辩人(被告)");
    fields.extend(party_fields("plaintiff", "被答辩人(原告)"));
    fields.extend([
        FormField::text("caseNumber", "案号", false, "如：(2024)京0105民初12345号"),
        FormField::textarea("defensePoints", "答辩意见", true, "请逐条列明答辩意见和事实依据"),
        FormField::textarea("evidence", "证据清单", false, "选填"),
    ]);

    DocumentTemplate::new(
        "defense-statement",
        "答辩状",
        Category::Litigation,
        "被告针对原告起诉进行答辩和反驳",
        fields,
    )
}
