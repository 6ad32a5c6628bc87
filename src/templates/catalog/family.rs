use super::party_fields;
use crate::templates::template_models::{Category, DocumentTemplate, FormField};

pub fn divorce_agreement() -> DocumentTemplate {
    let mut fields = party_fields("male", "男方");
    fields.extend(party_fields("female", "女方"));
    fields.extend([
        FormField::text("marriageDate", "结婚登记日期", true, "如：2018年6月1日"),
        FormField::text("marriagePlace", "结婚登记机关", false, "如：北京市朝阳区民政局"),
        FormField::select(
            "divorceReason",
            "离婚原因",
            true,
            &["感情不和", "性格不合", "长期分居", "家庭暴力", "其他"],
        ),
        FormField::textarea(
            "children",
            "子女情况",
            false,
            "如：婚生子/女XXX，XXXX年X月X日出生，抚养权归XX方，另一方每月支付抚养费XX元",
        ),
        FormField::textarea("property", "财产分配", true, "请详细列明共同财产的分配方案，如房产、存款、车辆等"),
        FormField::textarea("debt", "债务处理", false, "选填，如：双方确认无共同债务"),
    ]);

    DocumentTemplate::new(
        "divorce-agreement",
        "离婚协议书",
        Category::Family,
        "协议离婚时明确双方权利义务的法律文书",
        fields,
    )
}
