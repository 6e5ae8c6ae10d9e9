//! Rust spellings of schema names
//!
//! Identifiers follow prost's conventions so generated code lines up with
//! the message types it is included next to.

use heck::{ToSnakeCase, ToUpperCamelCase};
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::Ident;

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be raw identifiers and get a trailing underscore
const RESERVED: &[&str] = &["self", "super", "crate", "Self"];

/// Snake-case identifier text for a field or module name
pub fn snake(name: &str) -> String {
    let snake = name.to_snake_case();
    if RESERVED.contains(&snake.as_str()) {
        format!("{}_", snake)
    } else {
        snake
    }
}

/// Identifier for a field or module name
pub fn field_ident(name: &str) -> Ident {
    ident(&snake(name))
}

/// Identifier for a message or generated type name
pub fn type_ident(name: &str) -> Ident {
    ident(&camel(name))
}

/// UpperCamelCase spelling, as prost names message types
pub fn camel(name: &str) -> String {
    let camel = name.to_upper_camel_case();
    if camel == "Self" {
        format!("{}_", camel)
    } else {
        camel
    }
}

/// Identifier from already-cased text, raw when it is a keyword
pub fn ident(text: &str) -> Ident {
    if KEYWORDS.contains(&text) {
        Ident::new_raw(text, Span::call_site())
    } else {
        Ident::new(text, Span::call_site())
    }
}

/// `prefix` followed by the snake-cased message name, e.g. `default_read_blog_post`
pub fn fn_ident(prefix: &str, message: &str, suffix: &str) -> Ident {
    ident(&format!("{}{}{}", prefix, message.to_snake_case(), suffix))
}

/// Default table name: the pluralized snake case of the message name
pub fn table_name(message: &str) -> String {
    pluralize(&message.to_snake_case())
}

/// Pluralize the last word of a snake_case name
pub fn pluralize(snake: &str) -> String {
    let (head, word) = match snake.rfind('_') {
        Some(split) => snake.split_at(split + 1),
        None => ("", snake),
    };
    let plural = match word {
        "child" => "children".to_string(),
        "person" => "people".to_string(),
        _ if word.ends_with('y') && !ends_with_vowel_y(word) => {
            format!("{}ies", &word[..word.len() - 1])
        }
        _ if ["s", "x", "z", "ch", "sh"].iter().any(|end| word.ends_with(end)) => {
            format!("{}es", word)
        }
        _ => format!("{}s", word),
    };
    format!("{}{}", head, plural)
}

fn ends_with_vowel_y(word: &str) -> bool {
    let mut chars = word.chars().rev();
    chars.next();
    matches!(chars.next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}

/// Path prefix from the module of package `from` to the module of package `to`
///
/// prost nests packages as modules, so a sibling package is reached through
/// `super::`. The result is empty for the same package.
pub fn module_path(from: &str, to: &str) -> TokenStream {
    let from: Vec<&str> = from.split('.').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = to.split('.').filter(|s| !s.is_empty()).collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let ups = (common..from.len()).map(|_| quote!(super::));
    let downs = to[common..].iter().map(|part| {
        let part = field_ident(part);
        quote!(#part::)
    });
    quote!(#(#ups)* #(#downs)*)
}

/// `ident` as seen from package `from` when declared in package `to`
pub fn path_to(from: &str, to: &str, ident: &Ident) -> TokenStream {
    let prefix = module_path(from, to);
    quote!(#prefix #ident)
}
