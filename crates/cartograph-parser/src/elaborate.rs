//! Elaboration of parsed statements into a [`Document`].
//!
//! Assigns meaning to key paths: reserved keywords become attributes of the
//! shape, class or connection they belong to, every other key is a shape.
//! Values of reserved attributes are checked against the keyword tables
//! below, and every problem is collected before reading fails.

use crate::{
    document::{Arrowhead, Connection, Document, ShapeDecl, StyleMap},
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError},
    parser_types::{Block, EdgeOp, KeyPath, Statement, Subject},
    span::{Span, Spanned},
};

/// Shape keywords accepted after `shape:`.
const SHAPES: &[&str] = &[
    "rectangle",
    "square",
    "page",
    "parallelogram",
    "document",
    "cylinder",
    "queue",
    "package",
    "step",
    "callout",
    "stored_data",
    "person",
    "diamond",
    "oval",
    "circle",
    "hexagon",
    "cloud",
    "text",
    "code",
    "class",
    "sql_table",
    "image",
    "sequence_diagram",
    "c4-person",
];

/// Keywords accepted inside `style`.
const STYLE_KEYWORDS: &[&str] = &[
    "opacity",
    "stroke",
    "fill",
    "fill-pattern",
    "stroke-width",
    "stroke-dash",
    "border-radius",
    "shadow",
    "3d",
    "multiple",
    "double-border",
    "font",
    "font-size",
    "font-color",
    "animated",
    "bold",
    "italic",
    "underline",
    "text-transform",
];

/// Shapes accepted for `source-arrowhead` and `target-arrowhead`.
const ARROWHEAD_SHAPES: &[&str] = &[
    "triangle",
    "arrow",
    "diamond",
    "circle",
    "box",
    "cross",
    "cf-one",
    "cf-one-required",
    "cf-many",
    "cf-many-required",
];

/// Reserved keywords stored verbatim as shape attributes.
const PLAIN_ATTRIBUTES: &[&str] = &[
    "near",
    "icon",
    "tooltip",
    "link",
    "width",
    "height",
    "constraint",
    "grid-rows",
    "grid-columns",
    "grid-gap",
    "vertical-gap",
    "horizontal-gap",
    "top",
    "left",
];

/// Valid D2 keywords this reader does not handle.
const UNSUPPORTED: &[&str] = &["layers", "scenarios", "steps", "imports"];

fn is_reserved(keyword: &str) -> bool {
    matches!(
        keyword,
        "label"
            | "shape"
            | "style"
            | "class"
            | "classes"
            | "vars"
            | "direction"
            | "source-arrowhead"
            | "target-arrowhead"
    ) || PLAIN_ATTRIBUTES.contains(&keyword)
        || UNSUPPORTED.contains(&keyword)
}

/// Checks the value of a style keyword, returning what was expected on failure.
fn check_style_value(keyword: &str, value: &str) -> Result<(), &'static str> {
    let integer_in = |min: i64, max: i64| {
        value
            .parse::<i64>()
            .ok()
            .filter(|n| (min..=max).contains(n))
            .map(|_| ())
    };
    match keyword {
        "stroke-width" => integer_in(0, 15).ok_or("an integer between 0 and 15"),
        "stroke-dash" => integer_in(0, 10).ok_or("an integer between 0 and 10"),
        "border-radius" => integer_in(0, i64::MAX).ok_or("a non-negative integer"),
        "font-size" => integer_in(8, 100).ok_or("an integer between 8 and 100"),
        "opacity" => value
            .parse::<f64>()
            .ok()
            .filter(|n| (0.0..=1.0).contains(n))
            .map(|_| ())
            .ok_or("a number between 0 and 1"),
        "shadow" | "3d" | "multiple" | "double-border" | "animated" | "bold" | "italic"
        | "underline" => match value {
            "true" | "false" => Ok(()),
            _ => Err("`true` or `false`"),
        },
        "text-transform" => match value {
            "uppercase" | "lowercase" | "title" | "none" => Ok(()),
            _ => Err("`uppercase`, `lowercase`, `title` or `none`"),
        },
        _ => Ok(()),
    }
}

/// What an attribute statement applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Owner {
    Root,
    Shape(String),
    Class(String),
    Connection(usize),
}

impl Owner {
    fn describe(&self) -> &'static str {
        match self {
            Owner::Root => "the top level",
            Owner::Shape(_) => "a shape",
            Owner::Class(_) => "a class",
            Owner::Connection(_) => "a connection",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Source,
    Target,
}

/// Builds a [`Document`] from parsed statements.
pub(crate) struct Builder {
    document: Document,
    diagnostics: DiagnosticCollector,
}

impl Builder {
    pub(crate) fn new() -> Self {
        Self {
            document: Document::default(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    pub(crate) fn build(mut self, statements: &[Statement]) -> Result<Document, ParseError> {
        self.map_statements(statements, None);
        self.check_class_references();

        let Self {
            mut document,
            diagnostics,
        } = self;
        document.warnings = diagnostics.finish()?;
        Ok(document)
    }

    fn map_statements(&mut self, statements: &[Statement], scope: Option<&str>) {
        for statement in statements {
            match &statement.subject {
                Subject::Key(path) => self.key_statement(path, statement, scope),
                Subject::Edge {
                    endpoints,
                    operators,
                } => self.edge_statement(endpoints, operators, statement, scope),
            }
        }
    }

    fn key_statement(&mut self, path: &KeyPath, statement: &Statement, scope: Option<&str>) {
        let segments = path.segments();
        let reserved = segments
            .iter()
            .position(|segment| is_reserved(&segment.inner().to_lowercase()));

        match reserved {
            None => {
                let shape_path = self.declare_shape(scope, segments, true);
                if let Some(value) = &statement.value {
                    self.set_label(&Owner::Shape(shape_path.clone()), value.inner().clone());
                }
                if let Some(block) = &statement.block {
                    self.map_statements(&block.statements, Some(&shape_path));
                }
            }
            Some(index) => {
                let owner = if index == 0 {
                    scope.map_or(Owner::Root, |scope| Owner::Shape(scope.to_string()))
                } else {
                    Owner::Shape(self.declare_shape(scope, &segments[..index], true))
                };
                self.attribute(
                    &owner,
                    &segments[index..],
                    statement.value.as_ref(),
                    statement.block.as_ref(),
                );
            }
        }
    }

    fn edge_statement(
        &mut self,
        endpoints: &[KeyPath],
        operators: &[Spanned<EdgeOp>],
        statement: &Statement,
        scope: Option<&str>,
    ) {
        let mut paths = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            if let Some(segment) = endpoint
                .segments()
                .iter()
                .find(|segment| is_reserved(&segment.inner().to_lowercase()))
            {
                self.diagnostics.emit(
                    Diagnostic::error(format!(
                        "reserved keyword `{}` cannot be a connection endpoint",
                        segment.inner()
                    ))
                    .with_code(ErrorCode::E300)
                    .with_label(segment.span(), ErrorCode::E300.description())
                    .with_help("quote the key or rename the shape"),
                );
                return;
            }
            paths.push(self.declare_shape(scope, endpoint.segments(), false));
        }

        for (i, operator) in operators.iter().enumerate() {
            let index = self.document.connections.len();
            self.document.connections.push(Connection {
                source: paths[i].clone(),
                target: paths[i + 1].clone(),
                operator: *operator.inner(),
                label: statement.value.as_ref().map(|v| v.inner().clone()),
                style: StyleMap::new(),
                classes: Vec::new(),
                source_arrowhead: None,
                target_arrowhead: None,
                span: statement.span,
            });
            if let Some(block) = &statement.block {
                self.connection_block(index, block);
            }
        }
    }

    fn connection_block(&mut self, index: usize, block: &Block) {
        for statement in &block.statements {
            let Subject::Key(path) = &statement.subject else {
                self.misplaced(statement.span, "connection", "a connection");
                continue;
            };
            let segments = path.segments();
            let keyword = segments[0].inner().to_lowercase();
            if !is_reserved(&keyword) {
                self.misplaced(segments[0].span(), segments[0].inner(), "a connection");
                continue;
            }
            self.attribute(
                &Owner::Connection(index),
                segments,
                statement.value.as_ref(),
                statement.block.as_ref(),
            );
        }
    }

    /// Applies `attr` (starting with a reserved keyword) to `owner`.
    fn attribute(
        &mut self,
        owner: &Owner,
        attr: &[Spanned<String>],
        value: Option<&Spanned<String>>,
        block: Option<&Block>,
    ) {
        let head = &attr[0];
        let keyword = head.inner().to_lowercase();
        let rest = &attr[1..];

        match keyword.as_str() {
            "style" => self.style(owner, head.span(), rest, value, block),
            "source-arrowhead" | "target-arrowhead" => {
                let Owner::Connection(index) = owner else {
                    self.misplaced(head.span(), &keyword, owner.describe());
                    return;
                };
                let end = if keyword == "source-arrowhead" {
                    End::Source
                } else {
                    End::Target
                };
                self.arrowhead(*index, end, rest, value, block);
            }
            "classes" => {
                if *owner != Owner::Root {
                    self.misplaced(head.span(), &keyword, owner.describe());
                    return;
                }
                self.classes(head.span(), rest, value, block);
            }
            "vars" => {
                if *owner != Owner::Root {
                    self.misplaced(head.span(), &keyword, owner.describe());
                    return;
                }
                self.vars(String::new(), rest, value, block);
            }
            keyword if UNSUPPORTED.contains(&keyword) => {
                self.diagnostics.emit(
                    Diagnostic::error(format!("`{keyword}` is not supported"))
                        .with_code(ErrorCode::E300)
                        .with_label(head.span(), ErrorCode::E300.description()),
                );
            }
            _ => {
                if let Some(extra) = rest.first() {
                    self.diagnostics.emit(
                        Diagnostic::error(format!("`{keyword}` has no attribute `{}`", extra.inner()))
                            .with_code(ErrorCode::E300)
                            .with_label(extra.span(), ErrorCode::E300.description()),
                    );
                    return;
                }
                match value {
                    Some(value) => self.scalar_attribute(owner, head, value),
                    None => self.expected_value(head, "a value"),
                }
            }
        }
    }

    fn scalar_attribute(&mut self, owner: &Owner, head: &Spanned<String>, value: &Spanned<String>) {
        let keyword = head.inner().to_lowercase();
        match keyword.as_str() {
            "label" => self.set_label(owner, value.inner().clone()),
            "shape" => {
                let shape = value.inner().to_lowercase();
                if !SHAPES.contains(&shape.as_str()) {
                    self.diagnostics.emit(
                        Diagnostic::error(format!("unknown shape `{}`", value.inner()))
                            .with_code(ErrorCode::E302)
                            .with_label(value.span(), ErrorCode::E302.description())
                            .with_help(format!("expected one of: {}", SHAPES.join(", "))),
                    );
                    return;
                }
                match owner {
                    Owner::Shape(path) => {
                        if let Some(decl) = self.document.shapes.get_mut(path) {
                            decl.shape = Some(shape);
                        }
                    }
                    Owner::Class(name) => {
                        self.document.classes.entry(name.clone()).or_default().shape = Some(shape);
                    }
                    Owner::Root | Owner::Connection(_) => {
                        self.misplaced(head.span(), &keyword, owner.describe())
                    }
                }
            }
            "class" => match owner {
                Owner::Shape(path) => {
                    if let Some(decl) = self.document.shapes.get_mut(path) {
                        decl.classes.push(value.inner().clone());
                    }
                }
                Owner::Connection(index) => {
                    if let Some(connection) = self.document.connections.get_mut(*index) {
                        connection.classes.push(value.inner().clone());
                    }
                }
                Owner::Root | Owner::Class(_) => {
                    self.misplaced(head.span(), &keyword, owner.describe())
                }
            },
            "direction" => {
                if !matches!(value.inner().as_str(), "up" | "down" | "left" | "right") {
                    self.invalid_value(value, "`up`, `down`, `left` or `right`");
                    return;
                }
                match owner {
                    Owner::Root => self.document.direction = Some(value.inner().clone()),
                    Owner::Shape(path) => {
                        if let Some(decl) = self.document.shapes.get_mut(path) {
                            decl.attributes
                                .insert(keyword.clone(), value.inner().clone());
                        }
                    }
                    Owner::Class(_) | Owner::Connection(_) => {
                        self.misplaced(head.span(), &keyword, owner.describe())
                    }
                }
            }
            _ => {
                if matches!(keyword.as_str(), "grid-rows" | "grid-columns")
                    && !value.inner().parse::<u32>().is_ok_and(|n| n > 0)
                {
                    self.invalid_value(value, "a positive integer");
                    return;
                }
                match owner {
                    Owner::Root => {
                        self.document
                            .root_attributes
                            .insert(keyword, value.inner().clone());
                    }
                    Owner::Shape(path) => {
                        if let Some(decl) = self.document.shapes.get_mut(path) {
                            decl.attributes.insert(keyword, value.inner().clone());
                        }
                    }
                    Owner::Class(_) => {}
                    Owner::Connection(_) => self.misplaced(head.span(), &keyword, owner.describe()),
                }
            }
        }
    }

    fn style(
        &mut self,
        owner: &Owner,
        head_span: Span,
        rest: &[Spanned<String>],
        value: Option<&Spanned<String>>,
        block: Option<&Block>,
    ) {
        match (rest, value, block) {
            ([keyword], Some(value), _) => self.style_entry(owner, keyword, value),
            ([], _, Some(block)) => {
                for statement in &block.statements {
                    let entry = match (&statement.subject, &statement.value) {
                        (Subject::Key(path), Some(value)) if path.segments().len() == 1 => {
                            Some((&path.segments()[0], value))
                        }
                        _ => None,
                    };
                    match entry {
                        Some((keyword, value)) => self.style_entry(owner, keyword, value),
                        None => self.diagnostics.emit(
                            Diagnostic::error("style entries must be `keyword: value`")
                                .with_code(ErrorCode::E303)
                                .with_label(statement.span, ErrorCode::E303.description()),
                        ),
                    }
                }
            }
            _ => self.diagnostics.emit(
                Diagnostic::error("`style` expects a map or a single `style.keyword: value`")
                    .with_code(ErrorCode::E303)
                    .with_label(head_span, ErrorCode::E303.description()),
            ),
        }
    }

    fn style_entry(&mut self, owner: &Owner, keyword: &Spanned<String>, value: &Spanned<String>) {
        let name = keyword.inner().to_lowercase();
        if !STYLE_KEYWORDS.contains(&name.as_str()) {
            self.diagnostics.emit(
                Diagnostic::error(format!("unknown style keyword `{}`", keyword.inner()))
                    .with_code(ErrorCode::E301)
                    .with_label(keyword.span(), ErrorCode::E301.description())
                    .with_help(format!("expected one of: {}", STYLE_KEYWORDS.join(", "))),
            );
            return;
        }
        if let Err(expected) = check_style_value(&name, value.inner()) {
            self.invalid_value(value, expected);
            return;
        }

        let style = match owner {
            Owner::Root => Some(&mut self.document.root_style),
            Owner::Shape(path) => self.document.shapes.get_mut(path).map(|s| &mut s.style),
            Owner::Class(class) => Some(&mut self.document.classes.entry(class.clone()).or_default().style),
            Owner::Connection(index) => self
                .document
                .connections
                .get_mut(*index)
                .map(|c| &mut c.style),
        };
        if let Some(style) = style {
            style.insert(name, value.inner().clone());
        }
    }

    fn arrowhead(
        &mut self,
        index: usize,
        end: End,
        rest: &[Spanned<String>],
        value: Option<&Spanned<String>>,
        block: Option<&Block>,
    ) {
        if rest.is_empty() {
            if let Some(value) = value {
                self.arrowhead_mut(index, end).label = Some(value.inner().clone());
            }
            if let Some(block) = block {
                for statement in &block.statements {
                    match &statement.subject {
                        Subject::Key(path) => self.arrowhead_entry(
                            index,
                            end,
                            path.segments(),
                            statement.value.as_ref(),
                            statement.block.as_ref(),
                        ),
                        Subject::Edge { .. } => {
                            self.misplaced(statement.span, "connection", "an arrowhead")
                        }
                    }
                }
            }
        } else {
            self.arrowhead_entry(index, end, rest, value, block);
        }
    }

    fn arrowhead_entry(
        &mut self,
        index: usize,
        end: End,
        segments: &[Spanned<String>],
        value: Option<&Spanned<String>>,
        block: Option<&Block>,
    ) {
        let keyword = segments[0].inner().to_lowercase();
        match (keyword.as_str(), &segments[1..]) {
            ("shape", []) => {
                let Some(value) = value else {
                    return self.expected_value(&segments[0], "an arrowhead shape");
                };
                let shape = value.inner().to_lowercase();
                if !ARROWHEAD_SHAPES.contains(&shape.as_str()) {
                    self.diagnostics.emit(
                        Diagnostic::error(format!("unknown arrowhead `{}`", value.inner()))
                            .with_code(ErrorCode::E304)
                            .with_label(value.span(), ErrorCode::E304.description())
                            .with_help(format!("expected one of: {}", ARROWHEAD_SHAPES.join(", "))),
                    );
                    return;
                }
                self.arrowhead_mut(index, end).shape = Some(shape);
            }
            ("label", []) => {
                let Some(value) = value else {
                    return self.expected_value(&segments[0], "a label");
                };
                self.arrowhead_mut(index, end).label = Some(value.inner().clone());
            }
            ("style", [filled]) if filled.inner() == "filled" => {
                let Some(value) = value else {
                    return self.expected_value(filled, "`true` or `false`");
                };
                match value.inner().as_str() {
                    "true" => self.arrowhead_mut(index, end).filled = Some(true),
                    "false" => self.arrowhead_mut(index, end).filled = Some(false),
                    _ => self.invalid_value(value, "`true` or `false`"),
                }
            }
            ("style", []) if block.is_some() => {
                if let Some(block) = block {
                    for statement in &block.statements {
                        if let Subject::Key(path) = &statement.subject {
                            let mut nested = Vec::with_capacity(path.segments().len() + 1);
                            nested.push(segments[0].clone());
                            nested.extend(path.segments().iter().cloned());
                            self.arrowhead_entry(index, end, &nested, statement.value.as_ref(), None);
                        }
                    }
                }
            }
            _ => self.misplaced(segments[0].span(), segments[0].inner(), "an arrowhead"),
        }
    }

    fn arrowhead_mut(&mut self, index: usize, end: End) -> &mut Arrowhead {
        let connection = &mut self.document.connections[index];
        let slot = match end {
            End::Source => &mut connection.source_arrowhead,
            End::Target => &mut connection.target_arrowhead,
        };
        slot.get_or_insert_with(Arrowhead::default)
    }

    fn classes(
        &mut self,
        head_span: Span,
        rest: &[Spanned<String>],
        value: Option<&Spanned<String>>,
        block: Option<&Block>,
    ) {
        if let Some((name, attr)) = rest.split_first() {
            let owner = Owner::Class(name.inner().clone());
            self.document.classes.entry(name.inner().clone()).or_default();
            if attr.is_empty() {
                if let Some(block) = block {
                    self.class_body(&owner, block);
                }
            } else {
                self.attribute(&owner, attr, value, block);
            }
            return;
        }

        let Some(block) = block else {
            return self.diagnostics.emit(
                Diagnostic::error("`classes` expects a map")
                    .with_code(ErrorCode::E303)
                    .with_label(head_span, ErrorCode::E303.description()),
            );
        };
        for statement in &block.statements {
            let Subject::Key(path) = &statement.subject else {
                self.misplaced(statement.span, "connection", "`classes`");
                continue;
            };
            let segments = path.segments();
            self.classes(head_span, segments, statement.value.as_ref(), statement.block.as_ref());
        }
    }

    fn class_body(&mut self, owner: &Owner, block: &Block) {
        for statement in &block.statements {
            let Subject::Key(path) = &statement.subject else {
                self.misplaced(statement.span, "connection", owner.describe());
                continue;
            };
            let segments = path.segments();
            if !is_reserved(&segments[0].inner().to_lowercase()) {
                self.misplaced(segments[0].span(), segments[0].inner(), owner.describe());
                continue;
            }
            self.attribute(owner, segments, statement.value.as_ref(), statement.block.as_ref());
        }
    }

    /// Flattens `vars` into dotted keys.
    fn vars(
        &mut self,
        prefix: String,
        rest: &[Spanned<String>],
        value: Option<&Spanned<String>>,
        block: Option<&Block>,
    ) {
        let mut path = prefix;
        for segment in rest {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(segment.inner());
        }
        if let Some(value) = value {
            self.document.vars.insert(path.clone(), value.inner().clone());
        }
        if let Some(block) = block {
            for statement in &block.statements {
                if let Subject::Key(key) = &statement.subject {
                    self.vars(
                        path.clone(),
                        key.segments(),
                        statement.value.as_ref(),
                        statement.block.as_ref(),
                    );
                }
            }
        }
    }

    /// Declares every shape along `segments` under `scope`, returning the
    /// canonical path of the last one.
    fn declare_shape(
        &mut self,
        scope: Option<&str>,
        segments: &[Spanned<String>],
        explicit: bool,
    ) -> String {
        let mut parent = scope.map(str::to_string);
        for segment in segments {
            let key = segment.inner().to_lowercase();
            let path = match &parent {
                Some(parent) => format!("{parent}.{key}"),
                None => key,
            };
            if !self.document.shapes.contains_key(&path) {
                self.document.shapes.insert(
                    path.clone(),
                    ShapeDecl::new(
                        path.clone(),
                        segment.inner().clone(),
                        parent.clone(),
                        segment.span(),
                    ),
                );
                if let Some(parent_decl) = parent
                    .as_ref()
                    .and_then(|parent| self.document.shapes.get_mut(parent))
                {
                    parent_decl.children.push(path.clone());
                }
            }
            parent = Some(path);
        }

        let path = parent.unwrap_or_default();
        if explicit {
            if let Some(decl) = self.document.shapes.get_mut(&path) {
                decl.explicit = true;
            }
        }
        path
    }

    fn set_label(&mut self, owner: &Owner, label: String) {
        match owner {
            Owner::Root => {
                self.document
                    .root_attributes
                    .insert("label".to_string(), label);
            }
            Owner::Shape(path) => {
                if let Some(decl) = self.document.shapes.get_mut(path) {
                    decl.label = Some(label);
                }
            }
            Owner::Class(name) => {
                self.document.classes.entry(name.clone()).or_default().label = Some(label);
            }
            Owner::Connection(index) => {
                if let Some(connection) = self.document.connections.get_mut(*index) {
                    connection.label = Some(label);
                }
            }
        }
    }

    /// Warns about `class` references missing from the `classes` map.
    fn check_class_references(&mut self) {
        let mut missing = Vec::new();
        for shape in self.document.shapes.values() {
            for class in &shape.classes {
                if !self.document.classes.contains_key(class) {
                    missing.push((class.clone(), shape.span));
                }
            }
        }
        for connection in &self.document.connections {
            for class in &connection.classes {
                if !self.document.classes.contains_key(class) {
                    missing.push((class.clone(), connection.span));
                }
            }
        }
        for (class, span) in missing {
            self.diagnostics.emit(
                Diagnostic::warning(format!("class `{class}` is not defined"))
                    .with_code(ErrorCode::E305)
                    .with_label(span, "referenced here")
                    .with_help("add it to the top-level `classes` map"),
            );
        }
    }

    fn misplaced(&mut self, span: Span, keyword: &str, place: &str) {
        self.diagnostics.emit(
            Diagnostic::error(format!("`{keyword}` cannot be used in {place}"))
                .with_code(ErrorCode::E300)
                .with_label(span, ErrorCode::E300.description()),
        );
    }

    fn expected_value(&mut self, head: &Spanned<String>, expected: &str) {
        self.diagnostics.emit(
            Diagnostic::error(format!("`{}` expects {expected}", head.inner()))
                .with_code(ErrorCode::E303)
                .with_label(head.span(), ErrorCode::E303.description()),
        );
    }

    fn invalid_value(&mut self, value: &Spanned<String>, expected: &str) {
        self.diagnostics.emit(
            Diagnostic::error(format!("invalid value `{}`", value.inner()))
                .with_code(ErrorCode::E303)
                .with_label(value.span(), ErrorCode::E303.description())
                .with_help(format!("expected {expected}")),
        );
    }
}
