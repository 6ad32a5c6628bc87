use super::party_fields;
use crate::templates::template_models::{Category, DocumentTemplate, FormField};

pub fn loan_contract() -> DocumentTemplate {
    let mut fields = party_fields("lender", "出借人(甲方)");
    fields.extend(party_fields("borrower", "借款人(乙方)"));
    fields.extend([
        FormField::text("loanAmount", "借款金额（元）", true, "如：100000"),
        FormField::text("loanPurpose", "借款用途", false, "如：经营周转"),
        FormField::text("interestRate", "利率（年利率%）", true, "如：5"),
        FormField::text("loanTerm", "借款期限", true, "如：12个月，自2024年1月1日至2024年12月31日"),
        FormField::select(
            "repaymentMethod",
            "还款方式",
            true,
            &["到期一次性还本付息", "按月付息到期还本", "等额本息", "等额本金"],
        ),
        FormField::textarea("breachClause", "违约责任", false, "选填，如逾期利率、提前还款条款等"),
        FormField::select(
            "disputeResolution",
            "争议解决方式",
            true,
            &[
                "协商解决，协商不成向甲方所在地人民法院起诉",
                "协商解决，协商不成向乙方所在地人民法院起诉",
                "提交仲裁委员会仲裁",
            ],
        ),
    ]);

    DocumentTemplate::new(
        "loan-contract",
        "借款合同",
        Category::Contract,
        "规范借贷双方的权利义务关系",
        fields,
    )
}

pub fn rental_contract() -> DocumentTemplate {
    let mut fields = party_fields("lessor", "出租方(甲方)");
    fields.extend(party_fields("lessee", "承租方(乙方)"));
    fields.extend([
        FormField::text("propertyAddress", "租赁物地址/描述", true, "如：北京市朝阳区XX路XX号XX室"),
        FormField::text("rentalTerm", "租赁期限", true, "如：2024年1月1日至2025年12月31日"),
        FormField::text("rent", "租金（元/月）", true, "如：5000"),
        FormField::select("paymentMethod", "付款方式", true, &["押一付一", "押一付三", "押二付一", "年付"]),
        FormField::text("deposit", "押金（元）", false, "如：5000"),
        FormField::textarea("specialTerms", "特殊约定", false, "选填，如装修、转租、维修责任等"),
    ]);

    DocumentTemplate::new(
        "rental-contract",
        "租赁合同",
        Category::Contract,
        "明确出租方与承租方的租赁权利义务",
        fields,
    )
}
