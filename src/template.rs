//! Per-fragment command templates.
//!
//! A template is a list of tokens. Inside any token `{OFFSET}`, `{SIZE}` and `{FRAGMENT_INDEX}`
//! are replaced by the fragment's decimal offset, size and zero-based index. `{FRAG_ID}` and
//! `{SLICE_ID}` are accepted as older spellings of `{FRAGMENT_INDEX}`. `{{` and `}}` give
//! literal braces, and any other brace group is kept verbatim so that shell snippets such as
//! `awk '{print $1}'` survive rendering.

use crate::plan::Fragment;


#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Placeholder {
    Offset,
    Size,
    FragmentIndex,
}

impl Placeholder {
    fn from_name(name: &str) -> Option<Placeholder> {
        match name {
            "OFFSET" => Some(Placeholder::Offset),
            "SIZE" => Some(Placeholder::Size),
            "FRAGMENT_INDEX" | "FRAG_ID" | "SLICE_ID" => Some(Placeholder::FragmentIndex),
            _ => None,
        }
    }

    fn value(self, fragment: &Fragment) -> u64 {
        match self {
            Placeholder::Offset => fragment.offset,
            Placeholder::Size => fragment.size,
            Placeholder::FragmentIndex => fragment.index as u64,
        }
    }
}


/// The user supplied command, rendered once per fragment.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandTemplate {
    tokens: Vec<String>,
}

impl CommandTemplate {
    pub fn new<I, S>(tokens: I) -> CommandTemplate
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandTemplate {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Substitutes the placeholders of every token.
    pub fn render(&self, fragment: &Fragment) -> Vec<String> {
        self.tokens.iter().map(|token| substitute(token, fragment)).collect()
    }

    /// Renders the template and joins the tokens with single spaces, as handed to the shell.
    pub fn command_line(&self, fragment: &Fragment) -> String {
        self.render(fragment).join(" ")
    }
}

fn substitute(token: &str, fragment: &Fragment) -> String {
    let mut out = String::with_capacity(token.len());
    let mut rest = token;

    while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        }
        else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        }
        else if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
        }
        else {
            // An opening brace: only a closed group without nested braces can be a placeholder
            let name = tail[1..]
                .find(|c: char| c == '{' || c == '}')
                .filter(|&end| tail[1 + end..].starts_with('}'))
                .map(|end| &tail[1..1 + end]);

            match name {
                Some(name) => {
                    match Placeholder::from_name(name) {
                        Some(placeholder) => out.push_str(&placeholder.value(fragment).to_string()),
                        None => out.push_str(&tail[..name.len() + 2]),
                    }
                    rest = &tail[name.len() + 2..];
                },
                None => {
                    out.push('{');
                    rest = &tail[1..];
                },
            }
        }
    }

    out.push_str(rest);
    out
}
