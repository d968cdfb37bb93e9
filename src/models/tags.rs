/// A raw task name split into its display name and inline tags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedTask {
    pub name: String,
    pub tags: Vec<String>,
}

/// Splits `"buy milk #errand #home"` into `"buy milk "` and `["#errand", "#home"]`.
///
/// Only a `#` past the first character starts the tag section, so a name is
/// never emptied by it. Everything from that `#` on is split on single spaces;
/// tokens keep their `#` and duplicates are kept. Empty tokens left by runs of
/// spaces are dropped.
pub fn parse_task_input(raw: &str) -> ParsedTask {
    let Some((tag_start, _)) = raw.match_indices('#').find(|(index, _)| *index > 0) else {
        return ParsedTask {
            name: raw.to_string(),
            tags: vec![],
        };
    };

    let (name, tag_section) = raw.split_at(tag_start);
    let tags = tag_section
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect();

    ParsedTask {
        name: name.to_string(),
        tags,
    }
}
