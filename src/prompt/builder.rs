use serde::{Deserialize, Serialize};

use crate::templates::{DocumentTemplate, FormData};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Streaming chat-completions request sent to the model gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

pub fn system_prompt(document_name: &str) -> String {
    format!(
        r#"你是一名专业的AI法律文书助手，具备中国法律体系下的文书起草能力。

你的任务是根据用户提供的信息，生成一份规范的"{document_name}"。

要求：
1. 格式规范：严格遵循中国法院或相关机构的官方文书格式，包含标题、当事人信息、正文、落款等完整结构。
2. 语言专业：使用法言法语，准确引用相关法律条文（如《民法典》《民事诉讼法》等具体条款）。
3. 逻辑严谨：事实陈述清晰，法律论证有理有据。
4. 在文书末尾添加分隔线后附加免责声明：
   "【免责声明】本文书为AI生成的参考模板，不构成法律意见。建议在使用前咨询专业律师，根据实际情况调整。"

请直接输出文书全文，不要添加任何额外的说明或对话。"#
    )
}

/// One `- key: value` line per non-blank value. With a known template the
/// lines follow field order and use field labels; leftovers come last.
fn field_lines(form: &FormData, template: Option<&DocumentTemplate>) -> Vec<String> {
    let filled = |name: &str| form.get(name).filter(|v| !v.trim().is_empty());

    let Some(template) = template else {
        return form
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| format!("- {k}: {v}"))
            .collect();
    };

    let mut lines: Vec<String> = template
        .fields
        .iter()
        .filter_map(|f| filled(&f.name).map(|v| format!("- {}: {v}", f.label)))
        .collect();

    lines.extend(
        form.iter()
            .filter(|(k, v)| template.field(k).is_none() && !v.trim().is_empty())
            .map(|(k, v)| format!("- {k}: {v}")),
    );

    lines
}

pub fn user_prompt(
    document_name: &str,
    form: &FormData,
    template: Option<&DocumentTemplate>,
    existing_document: Option<&str>,
    follow_up: Option<&str>,
) -> String {
    match (existing_document, follow_up) {
        (Some(existing), Some(instruction)) if !existing.is_empty() && !instruction.is_empty() => format!(
            "以下是之前生成的\"{document_name}\"：\n\n{existing}\n\n请根据以下修改意见，重新生成完整的文书：\n{instruction}\n\n请输出修改后的完整文书。"
        ),
        _ => format!(
            "请根据以下信息生成一份\"{document_name}\"：\n\n{}",
            field_lines(form, template).join("\n")
        ),
    }
}

/// Assembles prompts for one generation or follow-up call.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    model: String,
}

impl PromptBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        PromptBuilder { model: model.into() }
    }

    pub fn build(
        &self,
        document_name: &str,
        form: &FormData,
        template: Option<&DocumentTemplate>,
        existing_document: Option<&str>,
        follow_up: Option<&str>,
    ) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: system_prompt(document_name),
                },
                ChatMessage {
                    role: Role::User,
                    content: user_prompt(document_name, form, template, existing_document, follow_up),
                },
            ],
            stream: true,
        }
    }
}
