use crate::models::{Category, Potential};

/// Lower-cased category spellings accepted in coded exports.
///
/// `faciliatating` is a recurring typo in hand-coded sheets. Anything not
/// listed here is left uncategorised.
pub static CATEGORY_ALIASES: &[(&str, Category)] = &[
    ("eliciting", Category::Eliciting),
    ("responding", Category::Responding),
    ("facilitating", Category::Facilitating),
    ("faciliatating", Category::Facilitating),
    ("extending", Category::Extending),
];

impl Category {
    pub fn normalize(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        CATEGORY_ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, category)| *category)
    }
}

impl Potential {
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "high" => Some(Self::High),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Case and whitespace insensitive header lookup.
///
/// A header that exactly repeats an earlier one is ignored, so the first copy
/// of an exact duplicate is used. Among distinct spellings that match loosely,
/// the last one wins.
pub fn find_column(headers: &[String], name: &str) -> Option<usize> {
    let wanted = name.trim().to_lowercase();
    headers
        .iter()
        .enumerate()
        .filter(|(index, header)| !headers[..*index].contains(*header))
        .filter(|(_, header)| header.trim().to_lowercase() == wanted)
        .map(|(index, _)| index)
        .last()
}
