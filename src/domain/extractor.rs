//! Entity Extraction Module
//!
//! Recovers structured declarations from raw Apex source text: classes,
//! triggers, methods, properties, annotations, DML statements and embedded
//! SOQL queries. Extraction is best-effort and never fails: a unit that does
//! not match the expected header shape yields no declaration, and unparseable
//! sub-tokens degrade to unknown values instead of aborting the unit.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::apex::{
    Annotation, ClassDeclaration, CollectionKind, DataOperation, DmlKind, MethodDeclaration,
    Modifier, Parameter, PropertyDeclaration, QueryStatement, TriggerDeclaration, TriggerTiming,
};

static CLASS_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?P<annotations>(?:@\w+(?:\s*\([^)]*\))?\s*)*)
        (?P<modifiers>(?:(?:private|public|global|protected|virtual|abstract)\s+)*)
        (?P<sharing>(?:(?:with|without|inherited)\s+sharing)\s+)?
        class\s+(?P<name>\w+)
        (?:\s+extends\s+(?P<superclass>[\w.]+(?:\s*<[^{;]*?>)?))?
        (?:\s+implements\s+(?P<interfaces>[\w.,\s<>]+?))?
        \s*\{",
    )
    .unwrap()
});

static TRIGGER_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"trigger\s+(?P<name>\w+)\s+on\s+(?P<object>\w+)\s*\(\s*(?P<contexts>[^)]*)\)")
        .unwrap()
});

static METHOD_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?P<annotations>(?:@\w+(?:\s*\([^)]*\))?\s*)*)
        (?P<modifiers>(?:(?:private|public|global|protected|static|virtual|abstract|override|testmethod)\s+)*)
        (?P<return_type>[A-Za-z_][\w.]*(?:\s*<[^={;()]*>)?(?:\s*\[\s*\])?)\s+
        (?P<name>[A-Za-z_]\w*)\s*\(",
    )
    .unwrap()
});

static PROPERTY_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?P<modifiers>(?:(?:private|public|global|protected|static)\s+)*)
        (?P<type>[A-Za-z_][\w.]*(?:\s*<[^={;()]*>)?(?:\s*\[\s*\])?)\s+
        (?P<name>[A-Za-z_]\w*)\s*\{",
    )
    .unwrap()
});

static ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(?P<name>\w+)(?:\s*\((?P<params>[^)]*)\))?").unwrap());

static CALL_CHAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<chain>[A-Za-z_]\w*(?:\s*\.\s*[A-Za-z_]\w*)*)\s*\(").unwrap()
});

static DML_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?P<op>insert|update|delete|upsert|merge)\s+(?P<target>[^;]+?);").unwrap()
});

static SOQL_QUERY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\[\s*(?P<query>select\s.+?\bfrom\s+[A-Za-z_]\w*[^\]]*)\]").unwrap()
});

static SOQL_OBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:from|join)\s+(?P<object>[A-Za-z_]\w*)").unwrap()
});

static DOC_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*\*(?P<text>.*?)\*/").unwrap());

static COLLECTION_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<kind>List|Set|Map)\s*<(?P<inner>.+)>$").unwrap());

static COLLECTION_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:List|Set)\s*<\s*(?P<inner>[A-Za-z_]\w*)").unwrap());

static GET_ACCESSOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bget\b\s*([;{])").unwrap());
static SET_ACCESSOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bset\b\s*([;{])").unwrap());

/// Words that can never be a return type or property type. Filters out
/// statements that happen to look like declarations.
const DECLARATION_KEYWORDS: [&str; 12] = [
    "new", "return", "throw", "if", "else", "while", "do", "for", "switch", "catch", "class",
    "trigger",
];

/// Call identifiers that are control-flow keywords, never method names.
const CONTROL_KEYWORDS: [&str; 4] = ["if", "while", "for", "switch"];

/// Per-byte brace depth, `None` inside string literals and comments.
type DepthMap = Vec<Option<u16>>;

/// Extractor for one source unit. Pure text in, declaration records out.
pub struct EntityExtractor;

impl EntityExtractor {
    /// Extract the outermost class declaration from a `.cls` unit.
    /// Returns `None` when no class header with a balanced body is found.
    pub fn extract_class(content: &str, source_path: &str) -> Option<ClassDeclaration> {
        let depths = code_depths(content);
        let caps = CLASS_HEADER.captures_iter(content).find(|caps| {
            let name_at = caps.name("name").map(|m| m.start()).unwrap_or(0);
            depths.get(name_at).copied().flatten().is_some()
        })?;

        Self::class_from_captures(content, &depths, &caps, source_path, 1)
    }

    /// Extract a trigger declaration from a `.trigger` unit.
    pub fn extract_trigger(content: &str) -> Option<TriggerDeclaration> {
        let depths = code_depths(content);
        let caps = TRIGGER_HEADER.captures_iter(content).find(|caps| {
            let name_at = caps.name("name").map(|m| m.start()).unwrap_or(0);
            depths.get(name_at).copied().flatten().is_some()
        })?;

        let timings: BTreeSet<TriggerTiming> = caps["contexts"]
            .split(',')
            .filter_map(TriggerTiming::parse)
            .collect();

        // Body is the balanced block after the context list; a truncated
        // unit falls back to the raw remainder.
        let header_end = caps.get(0)?.end();
        let body = match content[header_end..].find('{') {
            Some(rel) => {
                let open = header_end + rel;
                match find_balanced_close(content, &depths, open) {
                    Some(close) => content[open + 1..close].to_string(),
                    None => content[open..].to_string(),
                }
            }
            None => content[header_end..].to_string(),
        };

        Some(TriggerDeclaration {
            name: caps["name"].to_string(),
            object_name: caps["object"].to_string(),
            timings,
            body,
        })
    }

    /// `first_line` is the absolute 1-based line number of `content[0]`.
    fn class_from_captures(
        content: &str,
        depths: &DepthMap,
        caps: &regex::Captures<'_>,
        source_path: &str,
        first_line: usize,
    ) -> Option<ClassDeclaration> {
        let whole = caps.get(0)?;
        let open = whole.end() - 1;
        let close = find_balanced_close(content, depths, open)?;
        let body = &content[open + 1..close];
        let body_first_line = first_line + count_newlines(&content[..open + 1]);

        let mut modifiers = parse_modifiers(caps.name("modifiers").map_or("", |m| m.as_str()));
        if let Some(sharing) = caps.name("sharing") {
            let phrase = sharing.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
            modifiers.push(Modifier::from_token(&phrase));
        }

        let interfaces = caps
            .name("interfaces")
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(|i| i.trim().to_string())
                    .filter(|i| !i.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Some(ClassDeclaration {
            name: caps["name"].to_string(),
            source_path: source_path.to_string(),
            modifiers,
            annotations: parse_annotations(caps.name("annotations").map_or("", |m| m.as_str())),
            methods: Self::extract_methods(body, body_first_line),
            properties: Self::extract_properties(body, body_first_line),
            superclass: caps.name("superclass").map(|m| m.as_str().to_string()),
            interfaces,
            inner_classes: Self::extract_inner_classes(body, source_path, body_first_line),
            doc_comment: doc_comment_before(content, whole.start()),
        })
    }

    /// Enumerate top-level method declarations of a class body. Matches are
    /// only accepted at brace depth 0 so statements inside method bodies can
    /// never masquerade as declarations.
    fn extract_methods(body: &str, first_line: usize) -> Vec<MethodDeclaration> {
        let depths = code_depths(body);
        let mut methods = Vec::new();

        for caps in METHOD_HEADER.captures_iter(body) {
            let whole = caps.get(0).expect("group 0 always present");
            let name_at = caps.name("name").map(|m| m.start()).unwrap_or(whole.start());
            if depths.get(name_at).copied().flatten() != Some(0) {
                continue;
            }
            let return_type = normalize_type(&caps["return_type"]);
            if DECLARATION_KEYWORDS.contains(&return_type.as_str()) {
                continue;
            }

            let open_paren = whole.end() - 1;
            let Some(close_paren) = find_matching_paren(body, &depths, open_paren) else {
                continue;
            };
            let params = parse_parameters(&body[open_paren + 1..close_paren]);

            // Optional throws clause, then either a balanced body block or a
            // bare `;` (abstract/interface methods carry no body).
            let mut cursor = close_paren + 1;
            cursor += body[cursor..].len() - body[cursor..].trim_start().len();
            if body[cursor..].starts_with("throws") {
                match body[cursor..].find(|c: char| c == '{' || c == ';') {
                    Some(rel) => cursor += rel,
                    None => continue,
                }
            }
            let method_body = match body.as_bytes().get(cursor) {
                Some(b'{') => {
                    let Some(close) = find_balanced_close(body, &depths, cursor) else {
                        continue;
                    };
                    &body[cursor + 1..close]
                }
                Some(b';') => "",
                _ => continue,
            };

            let line = first_line + count_newlines(&body[..whole.start()]);
            let body_first_line = first_line + count_newlines(&body[..cursor]);
            let (calls, data_operations, queries) = parse_method_body(method_body, body_first_line);

            methods.push(MethodDeclaration {
                name: caps["name"].to_string(),
                return_type,
                parameters: params,
                modifiers: parse_modifiers(caps.name("modifiers").map_or("", |m| m.as_str())),
                annotations: parse_annotations(caps.name("annotations").map_or("", |m| m.as_str())),
                body: method_body.to_string(),
                calls,
                data_operations,
                queries,
                line,
                doc_comment: doc_comment_before(body, whole.start()),
            });
        }

        methods
    }

    /// Enumerate property declarations with optional `get`/`set` accessors.
    fn extract_properties(body: &str, first_line: usize) -> Vec<PropertyDeclaration> {
        let depths = code_depths(body);
        let mut properties = Vec::new();

        for caps in PROPERTY_HEADER.captures_iter(body) {
            let whole = caps.get(0).expect("group 0 always present");
            let name_at = caps.name("name").map(|m| m.start()).unwrap_or(whole.start());
            if depths.get(name_at).copied().flatten() != Some(0) {
                continue;
            }
            let type_name = normalize_type(&caps["type"]);
            if DECLARATION_KEYWORDS.contains(&type_name.as_str()) {
                continue;
            }

            let open = whole.end() - 1;
            let Some(close) = find_balanced_close(body, &depths, open) else {
                continue;
            };
            let accessors = &body[open + 1..close];
            // Only a `{ get ... set ... }` block is a property; any other
            // brace block after an identifier pair is not one.
            let getter = accessor_body(accessors, &GET_ACCESSOR);
            let setter = accessor_body(accessors, &SET_ACCESSOR);
            if getter.is_none() && setter.is_none() {
                continue;
            }

            properties.push(PropertyDeclaration {
                name: caps["name"].to_string(),
                type_name,
                modifiers: parse_modifiers(caps.name("modifiers").map_or("", |m| m.as_str())),
                getter: getter.flatten(),
                setter: setter.flatten(),
                line: first_line + count_newlines(&body[..whole.start()]),
            });
        }

        properties
    }

    fn extract_inner_classes(
        body: &str,
        source_path: &str,
        first_line: usize,
    ) -> Vec<ClassDeclaration> {
        let depths = code_depths(body);
        let mut inner = Vec::new();
        for caps in CLASS_HEADER.captures_iter(body) {
            let name_at = caps.name("name").map(|m| m.start());
            if name_at.and_then(|at| depths.get(at).copied().flatten()) != Some(0) {
                continue;
            }
            if let Some(class) =
                Self::class_from_captures(body, &depths, &caps, source_path, first_line)
            {
                inner.push(class);
            }
        }
        inner
    }
}

/// Recover call identifiers, DML operations and SOQL queries from one
/// method body. `first_line` is the absolute line of the body's first line.
fn parse_method_body(
    body: &str,
    first_line: usize,
) -> (BTreeSet<String>, Vec<DataOperation>, Vec<QueryStatement>) {
    let mut calls = BTreeSet::new();
    for caps in CALL_CHAIN.captures_iter(body) {
        let chain = caps.name("chain").expect("chain group");
        if preceded_by_new(body, chain.start()) {
            continue;
        }
        let segments: Vec<&str> = chain.as_str().split('.').map(str::trim).collect();
        let invoked = segments.last().copied().unwrap_or_default();
        if CONTROL_KEYWORDS.contains(&invoked) {
            continue;
        }
        for segment in segments {
            calls.insert(segment.to_string());
        }
    }

    let mut data_operations = Vec::new();
    for caps in DML_STATEMENT.captures_iter(body) {
        let whole = caps.get(0).expect("group 0 always present");
        let kind = match DmlKind::from_keyword(&caps["op"]) {
            Some(kind) => kind,
            None => continue,
        };
        let (object_type, is_bulk) = split_dml_target(&caps["target"]);
        data_operations.push(DataOperation {
            kind,
            object_type,
            is_bulk,
            line: first_line + count_newlines(&body[..whole.start()]),
        });
    }

    let mut queries = Vec::new();
    for caps in SOQL_QUERY.captures_iter(body) {
        let whole = caps.get(0).expect("group 0 always present");
        let query = caps["query"].trim().to_string();
        let mut referenced_objects = Vec::new();
        for object_caps in SOQL_OBJECT.captures_iter(&query) {
            let object = object_caps["object"].to_string();
            if !referenced_objects.contains(&object) {
                referenced_objects.push(object);
            }
        }
        queries.push(QueryStatement {
            query,
            referenced_objects,
            line: first_line + count_newlines(&body[..whole.start()]),
        });
    }

    (calls, data_operations, queries)
}

/// Parse a whitespace-separated modifier run. Unknown tokens survive as
/// `Modifier::Unknown` rather than failing the declaration.
fn parse_modifiers(raw: &str) -> Vec<Modifier> {
    raw.split_whitespace().map(Modifier::from_token).collect()
}

/// Parse an annotation run such as `@TestSetup @InvocableMethod(label='x')`.
fn parse_annotations(raw: &str) -> Vec<Annotation> {
    let mut annotations = Vec::new();
    for caps in ANNOTATION.captures_iter(raw) {
        let mut parameters = BTreeMap::new();
        if let Some(params) = caps.name("params") {
            let params = params.as_str().trim();
            if !params.is_empty() {
                if params.contains('=') {
                    for pair in params.split(',') {
                        let mut split = pair.splitn(2, '=');
                        let key = split.next().unwrap_or_default().trim();
                        match split.next() {
                            Some(value) => {
                                parameters.insert(
                                    key.to_string(),
                                    value.trim().trim_matches(['"', '\'']).to_string(),
                                );
                            }
                            // No `=` in this pair: keep the raw token.
                            None => {
                                parameters.insert("value".to_string(), pair.trim().to_string());
                            }
                        }
                    }
                } else {
                    parameters.insert(
                        "value".to_string(),
                        params.trim_matches(['"', '\'']).to_string(),
                    );
                }
            }
        }
        annotations.push(Annotation {
            name: caps["name"].to_string(),
            parameters,
        });
    }
    annotations
}

/// Split a parameter list on top-level commas (commas nested in generic
/// brackets or parentheses do not split) and shape each entry.
fn parse_parameters(raw: &str) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    for part in split_top_level(raw) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        // The trailing identifier is the name; everything before it is the type.
        let name_start = part
            .rfind(|c: char| !(c.is_alphanumeric() || c == '_'))
            .map(|i| i + char_len(part, i))
            .unwrap_or(0);
        let name = part[name_start..].to_string();
        let type_str = part[..name_start].trim();
        if name.is_empty() {
            continue;
        }

        let (type_name, is_collection, collection_kind) = shape_type(type_str);
        parameters.push(Parameter {
            name,
            type_name,
            is_collection,
            collection_kind,
        });
    }
    parameters
}

/// Classify a type string as plain, `List/Set/Map<...>` or `T[]`.
fn shape_type(type_str: &str) -> (String, bool, Option<CollectionKind>) {
    if let Some(caps) = COLLECTION_TYPE.captures(type_str) {
        let kind = CollectionKind::from_token(&caps["kind"]);
        return (caps["inner"].trim().to_string(), true, kind);
    }
    if let Some(stripped) = type_str.strip_suffix("[]") {
        return (
            stripped.trim().to_string(),
            true,
            Some(CollectionKind::Array),
        );
    }
    (type_str.to_string(), false, None)
}

/// Reduce a DML target expression to its object-type name and bulk flag.
fn split_dml_target(raw: &str) -> (String, bool) {
    let raw = raw.trim();
    let is_bulk = raw.contains("[]") || raw.contains('<');
    let stripped = raw.strip_prefix("new ").map(str::trim_start).unwrap_or(raw);
    if let Some(caps) = COLLECTION_TARGET.captures(stripped) {
        return (caps["inner"].to_string(), is_bulk);
    }
    let ident: String = stripped
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if ident.is_empty() {
        (raw.to_string(), is_bulk)
    } else {
        (ident, is_bulk)
    }
}

/// The last `/** ... */` block before `header_start`, provided only
/// whitespace and annotation lines separate it from the header.
fn doc_comment_before(text: &str, header_start: usize) -> Option<String> {
    let before = &text[..header_start];
    let caps = DOC_COMMENT.captures_iter(before).last()?;
    let whole = caps.get(0)?;
    let gap = &before[whole.end()..];
    let attached = gap
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .all(|line| line.starts_with('@'));
    if attached {
        Some(caps["text"].trim().to_string())
    } else {
        None
    }
}

/// True when the chain at `start` is preceded by the `new` keyword, i.e.
/// an object construction rather than a call site.
fn preceded_by_new(text: &str, start: usize) -> bool {
    let before = text[..start].trim_end();
    before.ends_with("new")
        && before[..before.len() - 3]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
}

/// `None`: no accessor. `Some(None)`: auto-implemented (`get;`).
/// `Some(Some(text))`: accessor with a body.
fn accessor_body(accessors: &str, pattern: &Regex) -> Option<Option<String>> {
    let caps = pattern.captures(accessors)?;
    let delim = caps.get(1).expect("delimiter group");
    if delim.as_str() == ";" {
        return Some(None);
    }
    let depths = code_depths(accessors);
    let close = find_balanced_close(accessors, &depths, delim.start())?;
    Some(Some(accessors[delim.start() + 1..close].trim().to_string()))
}

/// Collapse internal whitespace of a matched type so `Map<Id , Account>`
/// and `Map<Id, Account>` compare equal.
fn normalize_type(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ───────────────────────────────────────────────────────────────────────────
// Lexical scanning
// ───────────────────────────────────────────────────────────────────────────

/// Per-byte brace depth of `text`, with `None` for bytes inside string
/// literals or comments. Declaration patterns are only accepted where the
/// map reads `Some(0)`; a naive "first matching close brace" is wrong as
/// soon as any nested block exists.
fn code_depths(text: &str) -> DepthMap {
    enum State {
        Code,
        Str,
        LineComment,
        BlockComment,
    }

    let bytes = text.as_bytes();
    let mut map = vec![None; bytes.len()];
    let mut state = State::Code;
    let mut depth: u16 = 0;
    let mut i = 0;

    while i < bytes.len() {
        match state {
            State::Code => match bytes[i] {
                b'\'' => state = State::Str,
                b'/' if bytes.get(i + 1) == Some(&b'/') => state = State::LineComment,
                b'/' if bytes.get(i + 1) == Some(&b'*') => state = State::BlockComment,
                b'{' => {
                    map[i] = Some(depth);
                    depth = depth.saturating_add(1);
                }
                b'}' => {
                    depth = depth.saturating_sub(1);
                    map[i] = Some(depth);
                }
                _ => map[i] = Some(depth),
            },
            State::Str => match bytes[i] {
                b'\\' => i += 1,
                b'\'' => state = State::Code,
                _ => {}
            },
            State::LineComment => {
                if bytes[i] == b'\n' {
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    i += 1;
                    state = State::Code;
                }
            }
        }
        i += 1;
    }

    map
}

/// Byte index of the `}` closing the `{` at `open`, or `None` when the
/// block never balances (truncated unit).
fn find_balanced_close(text: &str, depths: &DepthMap, open: usize) -> Option<usize> {
    let open_depth = (*depths.get(open)?)?;
    let bytes = text.as_bytes();
    ((open + 1)..bytes.len()).find(|&i| bytes[i] == b'}' && depths[i] == Some(open_depth))
}

/// Byte index of the `)` matching the `(` at `open`.
fn find_matching_paren(text: &str, depths: &DepthMap, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut level = 0u32;
    for i in open..bytes.len() {
        if depths[i].is_none() {
            continue;
        }
        match bytes[i] {
            b'(' => level += 1,
            b')' => {
                level = level.saturating_sub(1);
                if level == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas at angle-bracket/parenthesis depth 0.
fn split_top_level(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in raw.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}

/// Length in bytes of the char starting at byte `i`.
fn char_len(s: &str, i: usize) -> usize {
    s[i..].chars().next().map_or(1, char::len_utf8)
}
