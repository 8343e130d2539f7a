/// Literal marker strings delimiting structured model input.
///
/// The separator reuses the end marker, so stripping is over two distinct
/// literals even though there are three roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialToken {
    Begin,
    End,
    Separator,
}

impl SpecialToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialToken::Begin => "<s>",
            SpecialToken::End => "</s>",
            SpecialToken::Separator => "</s>",
        }
    }

    pub fn all() -> [SpecialToken; 3] {
        [
            SpecialToken::Begin,
            SpecialToken::End,
            SpecialToken::Separator,
        ]
    }
}

/// Joins the example fields with the separator and wraps the result in the
/// begin/end markers: `<s> answer </s> context </s>`.
pub fn format_example(fields: &[&str]) -> String {
    let inner = fields.join(&format!(" {} ", SpecialToken::Separator.as_str()));
    format!(
        "{} {} {}",
        SpecialToken::Begin.as_str(),
        inner,
        SpecialToken::End.as_str()
    )
}

/// Removes every special token occurrence and trims the result. Idempotent.
pub fn strip_special_tokens(text: &str) -> String {
    let mut text = text.to_string();
    for token in SpecialToken::all() {
        text = text.replace(token.as_str(), "");
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_answer_and_context() {
        let input = format_example(&["Seattle", "Seattle is a seaport city."]);
        assert_eq!(input, "<s> Seattle </s> Seattle is a seaport city. </s>");
    }

    #[test]
    fn format_context_only() {
        let input = format_example(&["Seattle is a seaport city."]);
        assert_eq!(input, "<s> Seattle is a seaport city. </s>");
    }

    #[test]
    fn strip_removes_markers_in_any_order() {
        assert_eq!(
            strip_special_tokens("</s> What city? <s> </s>"),
            "What city?"
        );
        assert_eq!(
            strip_special_tokens("<s> What city? </s>"),
            "What city?"
        );
    }

    #[test]
    fn strip_is_idempotent() {
        let once = strip_special_tokens("<s> What city is it? </s></s>");
        let twice = strip_special_tokens(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "What city is it?");
    }

    #[test]
    fn strip_of_clean_text_is_a_no_op() {
        assert_eq!(strip_special_tokens("What city is it?"), "What city is it?");
    }
}
