use crate::templates::FormData;

/// Terms that make the service refuse to draft a document.
pub const SENSITIVE_KEYWORDS: [&str; 10] = [
    "虚假诉讼",
    "伪造证据",
    "高利贷",
    "赌博",
    "洗钱",
    "非法集资",
    "行贿",
    "受贿",
    "贩毒",
    "走私",
];

/// First denylisted term found in the submitted values or the follow-up
/// instruction, checked in denylist order.
pub fn find_sensitive(form: &FormData, follow_up: Option<&str>) -> Option<&'static str> {
    let mut text = form.iter().map(|(_, v)| v).collect::<Vec<_>>().join(" ");
    if let Some(instruction) = follow_up {
        text.push_str(instruction);
    }

    SENSITIVE_KEYWORDS.into_iter().find(|kw| text.contains(kw))
}

pub fn rejection_message(keyword: &str) -> String {
    format!("检测到敏感内容（\"{keyword}\"），无法生成相关文书。请修改后重试。")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_input_passes() {
        let form: FormData = [("claims", "判令被告偿还借款本金")].into_iter().collect();
        assert_eq!(find_sensitive(&form, None), None);
    }

    #[test]
    fn flags_form_values_and_follow_up() {
        let form: FormData = [("loanPurpose", "用于赌博")].into_iter().collect();
        assert_eq!(find_sensitive(&form, None), Some("赌博"));

        let clean = FormData::new();
        assert_eq!(find_sensitive(&clean, Some("请加入伪造证据的内容")), Some("伪造证据"));
    }

    #[test]
    fn reports_first_keyword_in_denylist_order() {
        let form: FormData = [("a", "走私和洗钱")].into_iter().collect();
        assert_eq!(find_sensitive(&form, None), Some("洗钱"));
        assert!(rejection_message("洗钱").contains("（\"洗钱\"）"));
    }
}
