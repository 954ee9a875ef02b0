//! The DEF library reads the parts of a Design Exchange Format file
//! that matter for building a hypergraph: the COMPONENTS, PINS and
//! NETS sections.  Everything else in the file (DIEAREA, ROWS, TRACKS,
//! VIAS, SPECIALNETS, ...) is stepped over.
//!
//! DEF is loosely line oriented.  A statement starts with `-` inside a
//! section and runs, possibly across several lines, until a `;` token.
//! The text is first split into tokens (each remembering its byte offset
//! and line), and a small state machine groups the tokens of each section
//! into statements.  The record scanners then pick the fields they need
//! out of each statement.
//!
//! Byte offsets are kept so that the placement writer can splice new
//! placement clauses into the original text without disturbing anything
//! else.
use std::fmt;

use log::debug;

use crate::error::{report, NetlistError, Warning};

/// A whitespace separated word of DEF text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub offset: usize,
    pub line: usize,
}

impl<'a> Token<'a> {
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// Split DEF text into tokens.  `#` starts a comment that runs to the end
/// of the line, double-quoted strings are kept whole, and a `;` glued to
/// the end of a word is split off into its own token.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\n' {
            line += 1;
            i += 1;
            continue;
        }
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if b == b'#' {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }

        let start = i;
        let start_line = line;
        if b == b'"' {
            i += 1;
            while i < bytes.len() && bytes[i] != b'"' {
                if bytes[i] == b'\n' {
                    line += 1;
                }
                i += 1;
            }
            i = (i + 1).min(bytes.len());
            tokens.push(Token {
                text: &text[start..i],
                offset: start,
                line: start_line,
            });
            continue;
        }

        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let word = &text[start..i];
        if word.len() > 1 && word.ends_with(';') {
            tokens.push(Token {
                text: &word[..word.len() - 1],
                offset: start,
                line,
            });
            tokens.push(Token {
                text: ";",
                offset: i - 1,
                line,
            });
        } else {
            tokens.push(Token {
                text: word,
                offset: start,
                line,
            });
        }
    }

    tokens
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Components,
    Pins,
    Nets,
}

impl Section {
    pub fn keyword(self) -> &'static str {
        match self {
            Section::Components => "COMPONENTS",
            Section::Pins => "PINS",
            Section::Nets => "NETS",
        }
    }

    fn from_keyword(word: &str) -> Option<Section> {
        match word {
            "COMPONENTS" => Some(Section::Components),
            "PINS" => Some(Section::Pins),
            "NETS" => Some(Section::Nets),
            _ => None,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    Inside(Section),
}

/// The tokens of one `- ... ;` entry.
#[derive(Debug, Clone)]
pub struct Statement<'a> {
    pub line: usize,
    pub tokens: Vec<Token<'a>>,
}

impl<'a> Statement<'a> {
    pub fn word(&self, i: usize) -> Option<&'a str> {
        self.tokens.get(i).map(|t| t.text)
    }

    /// Value following a `+ KEY` option, e.g. `+ DIRECTION INPUT`.
    pub fn option(&self, key: &str) -> Option<&'a str> {
        self.tokens
            .windows(3)
            .find(|w| w[0].text == "+" && w[1].text == key)
            .map(|w| w[2].text)
    }
}

#[derive(Debug, Clone)]
pub struct SectionBody<'a> {
    /// Count from the `COMPONENTS n ;` style header.
    pub declared: Option<usize>,
    /// Line of the section header.
    pub line: usize,
    pub statements: Vec<Statement<'a>>,
    closed: bool,
}

/// The three sections of a DEF file we care about, split into statements.
#[derive(Debug, Clone, Default)]
pub struct DefSections<'a> {
    components: Option<SectionBody<'a>>,
    pins: Option<SectionBody<'a>>,
    nets: Option<SectionBody<'a>>,
}

impl<'a> DefSections<'a> {
    pub fn scan(text: &'a str) -> DefSections<'a> {
        let mut sections = DefSections::default();
        let mut tokens = tokenize(text).into_iter().peekable();
        let mut state = ScanState::Outside;
        let mut current: Vec<Token<'a>> = Vec::new();

        while let Some(tok) = tokens.next() {
            if tok.text == "END" {
                let closes = match (state, tokens.peek()) {
                    (ScanState::Inside(s), Some(next)) => next.text == s.keyword(),
                    (ScanState::Outside, Some(_)) => current.is_empty(),
                    _ => false,
                };
                if closes {
                    let name = tokens.next();
                    if let ScanState::Inside(s) = state {
                        let body = sections.body_mut(s);
                        if let Some(body) = body.as_mut() {
                            if !current.is_empty() {
                                // Last entry lost its ';'.  Keep it, the
                                // record scanner decides what it is worth.
                                let stmt = std::mem::take(&mut current);
                                body.statements.push(Statement {
                                    line: stmt[0].line,
                                    tokens: stmt,
                                });
                            }
                            body.closed = true;
                        }
                        debug!("END {} on line {}", s, tok.line);
                    } else if let Some(name) = name {
                        debug!("skipped section {} ending on line {}", name.text, tok.line);
                    }
                    current.clear();
                    state = ScanState::Outside;
                    continue;
                }
            }

            if tok.text != ";" {
                current.push(tok);
                continue;
            }

            let stmt = std::mem::take(&mut current);
            if stmt.is_empty() {
                continue;
            }
            match state {
                ScanState::Outside => {
                    if let Some(s) = Section::from_keyword(stmt[0].text) {
                        debug!("{} section opens on line {}", s, stmt[0].line);
                        let declared = stmt.get(1).and_then(|t| t.text.parse().ok());
                        let body = sections.body_mut(s);
                        match body.as_mut() {
                            Some(existing) => {
                                existing.closed = false;
                                existing.declared = match (existing.declared, declared) {
                                    (Some(a), Some(b)) => Some(a + b),
                                    _ => None,
                                };
                            }
                            None => {
                                *body = Some(SectionBody {
                                    declared,
                                    line: stmt[0].line,
                                    statements: Vec::new(),
                                    closed: false,
                                });
                            }
                        }
                        state = ScanState::Inside(s);
                    }
                }
                ScanState::Inside(s) => {
                    if let Some(body) = sections.body_mut(s).as_mut() {
                        body.statements.push(Statement {
                            line: stmt[0].line,
                            tokens: stmt,
                        });
                    }
                }
            }
        }

        sections
    }

    fn body_mut(&mut self, section: Section) -> &mut Option<SectionBody<'a>> {
        match section {
            Section::Components => &mut self.components,
            Section::Pins => &mut self.pins,
            Section::Nets => &mut self.nets,
        }
    }

    fn body(&self, section: Section) -> &Option<SectionBody<'a>> {
        match section {
            Section::Components => &self.components,
            Section::Pins => &self.pins,
            Section::Nets => &self.nets,
        }
    }

    /// The statements of a section, or an error if it is missing or never
    /// closed.
    pub fn require(&self, section: Section) -> Result<&SectionBody<'a>, NetlistError> {
        match self.body(section) {
            None => Err(NetlistError::MissingSection {
                section: section.keyword(),
            }),
            Some(body) if !body.closed => Err(NetlistError::UnterminatedSection {
                section: section.keyword(),
                line: body.line,
            }),
            Some(body) => Ok(body),
        }
    }

    pub fn components(
        &self,
        warnings: &mut Vec<Warning>,
    ) -> Result<Vec<ComponentRecord>, NetlistError> {
        self.records(Section::Components, warnings, parse_component)
    }

    pub fn pins(&self, warnings: &mut Vec<Warning>) -> Result<Vec<PinRecord>, NetlistError> {
        self.records(Section::Pins, warnings, parse_pin)
    }

    pub fn nets(&self, warnings: &mut Vec<Warning>) -> Result<Vec<NetRecord>, NetlistError> {
        self.records(Section::Nets, warnings, parse_net)
    }

    fn records<T>(
        &self,
        section: Section,
        warnings: &mut Vec<Warning>,
        parse: fn(&Statement<'a>) -> Result<T, String>,
    ) -> Result<Vec<T>, NetlistError> {
        let body = self.require(section)?;
        let mut records = Vec::with_capacity(body.statements.len());
        for stmt in &body.statements {
            match parse(stmt) {
                Ok(r) => records.push(r),
                Err(reason) => report(
                    warnings,
                    Warning::MalformedEntry {
                        section: section.keyword(),
                        line: stmt.line,
                        reason,
                    },
                ),
            }
        }
        if let Some(declared) = body.declared {
            if declared != body.statements.len() {
                report(
                    warnings,
                    Warning::CountDiffers {
                        section: section.keyword(),
                        declared,
                        found: body.statements.len(),
                    },
                );
            }
        }
        Ok(records)
    }
}

/// Placement status keyword of a component or pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStatus {
    Unplaced,
    Placed,
    Fixed,
    Cover,
}

impl PlacementStatus {
    fn from_keyword(word: &str) -> Option<PlacementStatus> {
        match word {
            "UNPLACED" => Some(PlacementStatus::Unplaced),
            "PLACED" => Some(PlacementStatus::Placed),
            "FIXED" => Some(PlacementStatus::Fixed),
            "COVER" => Some(PlacementStatus::Cover),
            _ => None,
        }
    }

    /// Anything with a stated location is treated as fixed.
    pub fn is_fixed(self) -> bool {
        self != PlacementStatus::Unplaced
    }
}

/// A `+ STATUS [( x y ) orient]` clause, with token indices into the
/// statement it came from.  `keyword` is the index of the status word,
/// `end` is one past the last token of the clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementClause {
    pub status: PlacementStatus,
    pub at: Option<(i64, i64)>,
    pub keyword: usize,
    pub end: usize,
}

/// Find the first placement clause of a statement.
pub fn find_placement(tokens: &[Token]) -> Result<Option<PlacementClause>, String> {
    for i in 0..tokens.len().saturating_sub(1) {
        if tokens[i].text != "+" {
            continue;
        }
        let status = match PlacementStatus::from_keyword(tokens[i + 1].text) {
            Some(s) => s,
            None => continue,
        };
        let keyword = i + 1;
        if status == PlacementStatus::Unplaced {
            return Ok(Some(PlacementClause {
                status,
                at: None,
                keyword,
                end: keyword + 1,
            }));
        }

        let word = |k: usize| tokens.get(k).map(|t| t.text);
        if word(i + 2) != Some("(") || word(i + 5) != Some(")") {
            return Err(format!("{} is not followed by ( x y )", tokens[keyword].text));
        }
        let x = parse_coordinate(word(i + 3))?;
        let y = parse_coordinate(word(i + 4))?;
        let end = match word(i + 6) {
            Some(w) if w != "+" => i + 7,
            _ => i + 6,
        };
        return Ok(Some(PlacementClause {
            status,
            at: Some((x, y)),
            keyword,
            end,
        }));
    }
    Ok(None)
}

fn parse_coordinate(word: Option<&str>) -> Result<i64, String> {
    let word = word.ok_or_else(|| "coordinate missing".to_string())?;
    word.parse()
        .map_err(|_| format!("'{}' is not an integer coordinate", word))
}

fn entry_name<'a>(stmt: &Statement<'a>, what: &str) -> Result<&'a str, String> {
    match stmt.word(0) {
        Some("-") => {}
        Some(other) => return Err(format!("expected '-' but found '{}'", other)),
        None => return Err("empty statement".to_string()),
    }
    match stmt.word(1) {
        Some(name) if name != "+" && name != "(" => Ok(name),
        _ => Err(format!("missing {} name", what)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRecord {
    pub name: String,
    pub macro_name: String,
    pub status: PlacementStatus,
    pub x: i64,
    pub y: i64,
    pub line: usize,
}

impl ComponentRecord {
    pub fn is_fixed(&self) -> bool {
        self.status.is_fixed()
    }
}

pub(crate) fn parse_component(stmt: &Statement) -> Result<ComponentRecord, String> {
    let name = entry_name(stmt, "component")?;
    let macro_name = match stmt.word(2) {
        Some(m) if m != "+" => m,
        _ => "",
    };
    let (status, (x, y)) = match find_placement(&stmt.tokens)? {
        Some(clause) => (clause.status, clause.at.unwrap_or((0, 0))),
        None => (PlacementStatus::Unplaced, (0, 0)),
    };
    Ok(ComponentRecord {
        name: name.to_string(),
        macro_name: macro_name.to_string(),
        status,
        x,
        y,
        line: stmt.line,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
    Inout,
    Feedthru,
}

impl PinDirection {
    fn from_keyword(word: &str) -> Option<PinDirection> {
        match word {
            "INPUT" => Some(PinDirection::Input),
            "OUTPUT" => Some(PinDirection::Output),
            "INOUT" => Some(PinDirection::Inout),
            "FEEDTHRU" => Some(PinDirection::Feedthru),
            _ => None,
        }
    }
}

/// A top-level IO pin.  Pins are always fixed; `x`, `y` default to zero
/// when the pin has no placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRecord {
    pub name: String,
    pub net: Option<String>,
    pub direction: Option<PinDirection>,
    pub x: i64,
    pub y: i64,
    pub line: usize,
}

fn parse_pin(stmt: &Statement) -> Result<PinRecord, String> {
    let name = entry_name(stmt, "pin")?;
    let (x, y) = find_placement(&stmt.tokens)?
        .and_then(|c| c.at)
        .unwrap_or((0, 0));
    Ok(PinRecord {
        name: name.to_string(),
        net: stmt.option("NET").map(|n| n.to_string()),
        direction: stmt.option("DIRECTION").and_then(PinDirection::from_keyword),
        x,
        y,
        line: stmt.line,
    })
}

/// One `( ... )` connection of a net.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `( U12 A )`: pin A of component U12.
    Instance { instance: String, pin: String },
    /// `( PIN clk )`: a top-level IO pin.
    IoPin(String),
    /// `( * VDD )`: every component with that pin.
    Wildcard(String),
}

impl Endpoint {
    /// The vertex name this endpoint refers to.
    pub fn vertex_name(&self) -> &str {
        match self {
            Endpoint::Instance { instance, .. } => instance,
            Endpoint::IoPin(name) => name,
            Endpoint::Wildcard(pin) => pin,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Endpoint::Instance { instance, pin } => write!(f, "( {} {} )", instance, pin),
            Endpoint::IoPin(name) => write!(f, "( PIN {} )", name),
            Endpoint::Wildcard(pin) => write!(f, "( * {} )", pin),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetRecord {
    pub name: String,
    pub endpoints: Vec<Endpoint>,
    pub line: usize,
}

fn parse_net(stmt: &Statement) -> Result<NetRecord, String> {
    let name = entry_name(stmt, "net")?;
    let tokens = &stmt.tokens;
    let mut endpoints = Vec::new();
    let mut i = 2;
    while i < tokens.len() {
        match tokens[i].text {
            // Options and routing follow the connection list.
            "+" => break,
            "(" => {
                let close = tokens[i + 1..]
                    .iter()
                    .position(|t| t.text == ")")
                    .map(|p| p + i + 1)
                    .ok_or_else(|| format!("unclosed connection in net {}", name))?;
                if close < i + 3 {
                    return Err(format!("connection in net {} needs two names", name));
                }
                let owner = tokens[i + 1].text;
                let pin = tokens[i + 2].text.to_string();
                endpoints.push(match owner {
                    "PIN" => Endpoint::IoPin(pin),
                    "*" => Endpoint::Wildcard(pin),
                    _ => Endpoint::Instance {
                        instance: owner.to_string(),
                        pin,
                    },
                });
                i = close + 1;
            }
            other => {
                debug!("net {}: ignoring '{}' on line {}", name, other, tokens[i].line);
                i += 1;
            }
        }
    }
    Ok(NetRecord {
        name: name.to_string(),
        endpoints,
        line: stmt.line,
    })
}

/// Components in file order.  Warnings are logged.
pub fn scan_components(def_text: &str) -> Result<Vec<ComponentRecord>, NetlistError> {
    DefSections::scan(def_text).components(&mut Vec::new())
}

/// IO pins in file order.  Warnings are logged.
pub fn scan_pins(def_text: &str) -> Result<Vec<PinRecord>, NetlistError> {
    DefSections::scan(def_text).pins(&mut Vec::new())
}

/// Nets in file order.  Warnings are logged.
pub fn scan_nets(def_text: &str) -> Result<Vec<NetRecord>, NetlistError> {
    DefSections::scan(def_text).nets(&mut Vec::new())
}
