//! 프롬프트 모듈 - 언어별 시스템 프롬프트 + 사용자 프롬프트 렌더링

use std::fmt;
use std::str::FromStr;

use crate::error::RagError;
use crate::knowledge::Document;

/// 지원 언어
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    En,
    #[default]
    De,
}

impl Language {
    /// ISO 639-1 코드
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::De => "de",
        }
    }
}

impl FromStr for Language {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Self::En),
            "de" => Ok(Self::De),
            other => Err(RagError::UnsupportedLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

const SYSTEM_PROMPT_EN: &str = "You are a helpful assistant that answers questions \
using facts from Wikidata. Answer only from the provided context. \
If the context does not contain the answer, say that you do not know. \
Keep the answer short and mention the Wikidata entity (QID) you relied on when possible.";

const SYSTEM_PROMPT_DE: &str = "Du bist ein hilfreicher Assistent, der Fragen anhand von \
Fakten aus Wikidata beantwortet. Antworte ausschließlich auf Grundlage des gegebenen Kontexts. \
Wenn der Kontext die Antwort nicht enthält, sage, dass du es nicht weißt. \
Antworte kurz und nenne nach Möglichkeit die verwendete Wikidata-Entität (QID).";

/// 언어별 시스템 프롬프트
pub fn system_prompt(lang: Language) -> &'static str {
    match lang {
        Language::En => SYSTEM_PROMPT_EN,
        Language::De => SYSTEM_PROMPT_DE,
    }
}

struct UserTemplate {
    context_header: &'static str,
    empty_context: &'static str,
    question_label: &'static str,
    answer_label: &'static str,
}

const USER_TEMPLATE_EN: UserTemplate = UserTemplate {
    context_header: "Answer the question based on the following Wikidata statements.\n\nContext:",
    empty_context: "(no relevant statements found)",
    question_label: "Question:",
    answer_label: "Answer:",
};

const USER_TEMPLATE_DE: UserTemplate = UserTemplate {
    context_header: "Beantworte die Frage anhand der folgenden Wikidata-Aussagen.\n\nKontext:",
    empty_context: "(keine relevanten Aussagen gefunden)",
    question_label: "Frage:",
    answer_label: "Antwort:",
};

/// 사용자 프롬프트 렌더링
///
/// 문서마다 한 줄씩 (`qid`가 있으면 `[Q937]` 접두어) 나열한 뒤 질문을 붙입니다.
pub fn render_user_prompt(lang: Language, question: &str, documents: &[Document]) -> String {
    let template = match lang {
        Language::En => &USER_TEMPLATE_EN,
        Language::De => &USER_TEMPLATE_DE,
    };

    let mut prompt = String::new();
    prompt.push_str(template.context_header);
    prompt.push('\n');

    if documents.is_empty() {
        prompt.push_str(template.empty_context);
        prompt.push('\n');
    }

    for doc in documents {
        let content = doc.content.replace('\n', " ");
        match doc.meta_str("qid") {
            Some(qid) => prompt.push_str(&format!("- [{}] {}\n", qid, content.trim())),
            None => prompt.push_str(&format!("- {}\n", content.trim())),
        }
    }

    prompt.push('\n');
    prompt.push_str(&format!("{} {}\n", template.question_label, question.trim()));
    prompt.push_str(template.answer_label);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn doc(content: &str, qid: Option<&str>) -> Document {
        let mut meta = Map::new();
        if let Some(qid) = qid {
            meta.insert("qid".to_string(), json!(qid));
        }
        Document::new(content, meta)
    }

    #[test]
    fn test_parse_language() {
        assert_eq!("en".parse::<Language>().unwrap(), Language::En);
        assert_eq!(" DE ".parse::<Language>().unwrap(), Language::De);
        assert!(matches!(
            "fr".parse::<Language>(),
            Err(RagError::UnsupportedLanguage(code)) if code == "fr"
        ));
        assert_eq!(Language::default(), Language::De);
        assert_eq!(Language::En.to_string(), "en");
    }

    #[test]
    fn test_system_prompts_differ() {
        assert!(system_prompt(Language::En).contains("Wikidata"));
        assert!(system_prompt(Language::De).contains("Kontext"));
    }

    #[test]
    fn test_render_user_prompt() {
        let docs = vec![
            doc("Albert Einstein date of birth 1879-03-14", Some("Q937")),
            doc("line one\nline two", None),
        ];
        let prompt = render_user_prompt(Language::En, "When was Einstein born?", &docs);

        assert!(prompt.contains("- [Q937] Albert Einstein date of birth 1879-03-14\n"));
        assert!(prompt.contains("- line one line two\n"));
        assert!(prompt.contains("Question: When was Einstein born?\n"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn test_render_user_prompt_without_documents() {
        let prompt = render_user_prompt(Language::De, "Wer ist Einstein?", &[]);
        assert!(prompt.contains("keine relevanten Aussagen"));
        assert!(prompt.contains("Frage: Wer ist Einstein?"));
    }
}
