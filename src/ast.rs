//! The ink syntax tree.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`]. A
//! container owns its children through the id lists in its [`NodeKind`];
//! every node also records its parent, so path resolution can walk upwards
//! without reference cycles.
//!
//! While parsing, nodes are allocated in a working arena whose spans are
//! optional and may contain abandoned nodes. [`Arena::into_story`] turns it
//! into a [`Story`]: only nodes reachable from the root survive, ids are
//! renumbered in pre-order, parents are relinked, and every node gets a span.

pub mod pretty;
pub mod weave;

use std::fmt;

use serde::Serialize;

use crate::engine::Checkpoint;

// ============================================================================
// IDS AND SPANS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A location in the original source. `line` and `column` are one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub struct Position {
    /// Character offset.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl From<&Checkpoint> for Position {
    fn from(checkpoint: &Checkpoint) -> Self {
        Position {
            offset: checkpoint.offset,
            line: checkpoint.line + 1,
            column: checkpoint.column + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn between(start: &Checkpoint, end: &Checkpoint) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// True when `other` lies entirely inside this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start.offset <= other.start.offset && other.end.offset <= self.end.offset
    }

    pub fn cover(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

// ============================================================================
// NODE PAYLOADS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowKind {
    Knot,
    Stitch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowArgument {
    pub name: String,
    pub is_by_reference: bool,
    pub is_divert_target: bool,
}

bitflags::bitflags! {
    /// How a sequence picks its next alternative.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
    pub struct SequenceType: u8 {
        const STOPPING = 0b0001;
        const CYCLE    = 0b0010;
        const SHUFFLE  = 0b0100;
        const ONCE     = 0b1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum NumberValue {
    Int(i32),
    Float(f32),
    Bool(bool),
}

impl fmt::Display for NumberValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberValue::Int(v) => write!(f, "{v}"),
            NumberValue::Float(v) => write!(f, "{v:?}"),
            NumberValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    And,
    Or,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Has,
    Hasnt,
    Intersect,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    /// Canonical spelling, with word operators normalised to symbols.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Has => "?",
            BinaryOp::Hasnt => "!?",
            BinaryOp::Intersect => "^",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        }
    }
}

// ============================================================================
// NODE KINDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum NodeKind {
    /// The root of a file.
    Story { content: Vec<NodeId> },
    Text { text: String },
    Glue,
    Tag { is_start: bool },
    Identifier { name: String },
    /// Dot-separated identifiers.
    Path { components: Vec<NodeId> },
    Divert {
        target: Option<NodeId>,
        arguments: Vec<NodeId>,
        is_tunnel: bool,
        is_thread: bool,
        is_empty: bool,
    },
    /// `->->`, optionally continuing to another divert.
    TunnelOnwards { divert_after: Option<NodeId> },
    /// `-> path` used as a value.
    DivertTarget { divert: NodeId },
    ContentList { content: Vec<NodeId> },
    Choice {
        name: Option<NodeId>,
        condition: Option<NodeId>,
        start_content: Option<NodeId>,
        choice_only_content: Option<NodeId>,
        inner_content: Option<NodeId>,
        indentation_depth: usize,
        once_only: bool,
        has_weave_style_brackets: bool,
        is_invisible_default: bool,
    },
    Gather {
        name: Option<NodeId>,
        indentation_depth: usize,
        /// Choices at the same weave level that flow into this gather.
        rejoins: Vec<NodeId>,
    },
    Weave {
        content: Vec<NodeId>,
        base_indentation: usize,
    },
    Flow {
        flow_kind: FlowKind,
        name: NodeId,
        arguments: Vec<FlowArgument>,
        content: Vec<NodeId>,
        is_function: bool,
    },
    Sequence {
        sequence_type: SequenceType,
        alternatives: Vec<NodeId>,
    },
    Conditional {
        initial_condition: Option<NodeId>,
        branches: Vec<NodeId>,
    },
    ConditionalBranch {
        own_condition: Option<NodeId>,
        content: Vec<NodeId>,
        is_true_branch: bool,
        is_else: bool,
        matching_equality: bool,
        is_inline: bool,
    },
    VariableAssignment {
        name: NodeId,
        value: Option<NodeId>,
        is_global_declaration: bool,
        is_new_temporary: bool,
    },
    ConstDeclaration { name: NodeId, value: NodeId },
    ListDefinition { elements: Vec<NodeId> },
    ListElement {
        name: NodeId,
        in_initial_list: bool,
        value: Option<i32>,
    },
    ListLiteral { items: Vec<NodeId> },
    ExternalDeclaration {
        name: NodeId,
        parameters: Vec<String>,
    },
    FunctionCall {
        name: NodeId,
        arguments: Vec<NodeId>,
        should_pop_returned_value: bool,
    },
    VariableReference { path: Vec<NodeId> },
    Number { value: NumberValue },
    StringExpression { content: Vec<NodeId> },
    Unary { op: UnaryOp, inner: NodeId },
    Binary {
        left: NodeId,
        op: BinaryOp,
        right: NodeId,
    },
    IncDec {
        target: NodeId,
        expression: Option<NodeId>,
        is_increment: bool,
    },
    MultipleCondition { conditions: Vec<NodeId> },
    Return { value: Option<NodeId> },
    AuthorWarning { message: String },
    IncludedFile { story: Option<Box<Story>> },
}

impl NodeKind {
    /// Short name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Story { .. } => "Story",
            NodeKind::Text { .. } => "Text",
            NodeKind::Glue => "Glue",
            NodeKind::Tag { .. } => "Tag",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::Path { .. } => "Path",
            NodeKind::Divert { .. } => "Divert",
            NodeKind::TunnelOnwards { .. } => "TunnelOnwards",
            NodeKind::DivertTarget { .. } => "DivertTarget",
            NodeKind::ContentList { .. } => "ContentList",
            NodeKind::Choice { .. } => "Choice",
            NodeKind::Gather { .. } => "Gather",
            NodeKind::Weave { .. } => "Weave",
            NodeKind::Flow { .. } => "Flow",
            NodeKind::Sequence { .. } => "Sequence",
            NodeKind::Conditional { .. } => "Conditional",
            NodeKind::ConditionalBranch { .. } => "ConditionalBranch",
            NodeKind::VariableAssignment { .. } => "VariableAssignment",
            NodeKind::ConstDeclaration { .. } => "ConstDeclaration",
            NodeKind::ListDefinition { .. } => "ListDefinition",
            NodeKind::ListElement { .. } => "ListElement",
            NodeKind::ListLiteral { .. } => "ListLiteral",
            NodeKind::ExternalDeclaration { .. } => "ExternalDeclaration",
            NodeKind::FunctionCall { .. } => "FunctionCall",
            NodeKind::VariableReference { .. } => "VariableReference",
            NodeKind::Number { .. } => "Number",
            NodeKind::StringExpression { .. } => "StringExpression",
            NodeKind::Unary { .. } => "Unary",
            NodeKind::Binary { .. } => "Binary",
            NodeKind::IncDec { .. } => "IncDec",
            NodeKind::MultipleCondition { .. } => "MultipleCondition",
            NodeKind::Return { .. } => "Return",
            NodeKind::AuthorWarning { .. } => "AuthorWarning",
            NodeKind::IncludedFile { .. } => "IncludedFile",
        }
    }

    /// Owned children, in source order.
    pub fn children(&self) -> Vec<NodeId> {
        fn push(out: &mut Vec<NodeId>, id: Option<NodeId>) {
            out.extend(id);
        }
        let mut out = Vec::new();
        match self {
            NodeKind::Story { content }
            | NodeKind::ContentList { content }
            | NodeKind::Weave { content, .. }
            | NodeKind::StringExpression { content } => out.extend_from_slice(content),
            NodeKind::Path { components } => out.extend_from_slice(components),
            NodeKind::ListDefinition { elements } => out.extend_from_slice(elements),
            NodeKind::ListLiteral { items } => out.extend_from_slice(items),
            NodeKind::VariableReference { path } => out.extend_from_slice(path),
            NodeKind::MultipleCondition { conditions } => out.extend_from_slice(conditions),
            NodeKind::Sequence { alternatives, .. } => out.extend_from_slice(alternatives),
            NodeKind::Divert {
                target, arguments, ..
            } => {
                push(&mut out, *target);
                out.extend_from_slice(arguments);
            }
            NodeKind::TunnelOnwards { divert_after } => push(&mut out, *divert_after),
            NodeKind::DivertTarget { divert } => out.push(*divert),
            NodeKind::Choice {
                name,
                condition,
                start_content,
                choice_only_content,
                inner_content,
                ..
            } => {
                for id in [name, condition, start_content, choice_only_content, inner_content] {
                    push(&mut out, *id);
                }
            }
            NodeKind::Gather { name, .. } => push(&mut out, *name),
            NodeKind::Flow { name, content, .. } => {
                out.push(*name);
                out.extend_from_slice(content);
            }
            NodeKind::Conditional {
                initial_condition,
                branches,
            } => {
                push(&mut out, *initial_condition);
                out.extend_from_slice(branches);
            }
            NodeKind::ConditionalBranch {
                own_condition,
                content,
                ..
            } => {
                push(&mut out, *own_condition);
                out.extend_from_slice(content);
            }
            NodeKind::VariableAssignment { name, value, .. } => {
                out.push(*name);
                push(&mut out, *value);
            }
            NodeKind::ConstDeclaration { name, value } => out.extend([*name, *value]),
            NodeKind::ListElement { name, .. } | NodeKind::ExternalDeclaration { name, .. } => {
                out.push(*name)
            }
            NodeKind::FunctionCall {
                name, arguments, ..
            } => {
                out.push(*name);
                out.extend_from_slice(arguments);
            }
            NodeKind::Unary { inner, .. } => out.push(*inner),
            NodeKind::Binary { left, right, .. } => out.extend([*left, *right]),
            NodeKind::IncDec {
                target, expression, ..
            } => {
                out.push(*target);
                push(&mut out, *expression);
            }
            NodeKind::Return { value } => push(&mut out, *value),
            NodeKind::Text { .. }
            | NodeKind::Glue
            | NodeKind::Tag { .. }
            | NodeKind::Identifier { .. }
            | NodeKind::Number { .. }
            | NodeKind::AuthorWarning { .. }
            | NodeKind::IncludedFile { .. } => {}
        }
        out
    }

    /// Rewrites every owned child id in place.
    fn remap_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        fn all(ids: &mut [NodeId], f: &mut dyn FnMut(NodeId) -> NodeId) {
            for id in ids {
                *id = f(*id);
            }
        }
        fn opt(id: &mut Option<NodeId>, f: &mut dyn FnMut(NodeId) -> NodeId) {
            if let Some(id) = id {
                *id = f(*id);
            }
        }
        match self {
            NodeKind::Story { content }
            | NodeKind::ContentList { content }
            | NodeKind::Weave { content, .. }
            | NodeKind::StringExpression { content } => all(content, f),
            NodeKind::Path { components } => all(components, f),
            NodeKind::ListDefinition { elements } => all(elements, f),
            NodeKind::ListLiteral { items } => all(items, f),
            NodeKind::VariableReference { path } => all(path, f),
            NodeKind::MultipleCondition { conditions } => all(conditions, f),
            NodeKind::Sequence { alternatives, .. } => all(alternatives, f),
            NodeKind::Divert { target, arguments, .. } => {
                opt(target, f);
                all(arguments, f);
            }
            NodeKind::TunnelOnwards { divert_after } => opt(divert_after, f),
            NodeKind::DivertTarget { divert } => *divert = f(*divert),
            NodeKind::Choice {
                name,
                condition,
                start_content,
                choice_only_content,
                inner_content,
                ..
            } => {
                opt(name, f);
                opt(condition, f);
                opt(start_content, f);
                opt(choice_only_content, f);
                opt(inner_content, f);
            }
            NodeKind::Gather { name, .. } => opt(name, f),
            NodeKind::Flow { name, content, .. } => {
                *name = f(*name);
                all(content, f);
            }
            NodeKind::Conditional {
                initial_condition,
                branches,
            } => {
                opt(initial_condition, f);
                all(branches, f);
            }
            NodeKind::ConditionalBranch {
                own_condition,
                content,
                ..
            } => {
                opt(own_condition, f);
                all(content, f);
            }
            NodeKind::VariableAssignment { name, value, .. } => {
                *name = f(*name);
                opt(value, f);
            }
            NodeKind::ConstDeclaration { name, value } => {
                *name = f(*name);
                *value = f(*value);
            }
            NodeKind::ListElement { name, .. } | NodeKind::ExternalDeclaration { name, .. } => {
                *name = f(*name)
            }
            NodeKind::FunctionCall { name, arguments, .. } => {
                *name = f(*name);
                all(arguments, f);
            }
            NodeKind::Unary { inner, .. } => *inner = f(*inner),
            NodeKind::Binary { left, right, .. } => {
                *left = f(*left);
                *right = f(*right);
            }
            NodeKind::IncDec {
                target, expression, ..
            } => {
                *target = f(*target);
                opt(expression, f);
            }
            NodeKind::Return { value } => opt(value, f),
            NodeKind::Text { .. }
            | NodeKind::Glue
            | NodeKind::Tag { .. }
            | NodeKind::Identifier { .. }
            | NodeKind::Number { .. }
            | NodeKind::AuthorWarning { .. }
            | NodeKind::IncludedFile { .. } => {}
        }
    }

    /// Choice or gather depth, for weave construction.
    pub fn weave_point_depth(&self) -> Option<usize> {
        match self {
            NodeKind::Choice {
                indentation_depth, ..
            }
            | NodeKind::Gather {
                indentation_depth, ..
            } => Some(*indentation_depth),
            _ => None,
        }
    }

    pub fn is_flow(&self) -> bool {
        matches!(self, NodeKind::Flow { .. })
    }

    /// Nodes that evaluate to a value.
    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            NodeKind::Number { .. }
                | NodeKind::StringExpression { .. }
                | NodeKind::DivertTarget { .. }
                | NodeKind::VariableReference { .. }
                | NodeKind::ListLiteral { .. }
                | NodeKind::FunctionCall { .. }
                | NodeKind::Unary { .. }
                | NodeKind::Binary { .. }
                | NodeKind::IncDec { .. }
                | NodeKind::MultipleCondition { .. }
        )
    }
}

/// Read access to nodes by id, shared by the working arena and finished stories.
pub trait NodeLookup {
    fn kind(&self, id: NodeId) -> &NodeKind;
}

// ============================================================================
// WORKING ARENA
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub span: Option<Span>,
}

/// Nodes under construction.
#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
}

impl Arena {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Allocates a node and adopts its children.
    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::from_index(self.slots.len());
        for child in kind.children() {
            if let Some(slot) = self.slots.get_mut(child.index()) {
                slot.parent = Some(id);
            }
        }
        self.slots.push(Slot {
            kind,
            parent: None,
            span: None,
        });
        id
    }

    /// Allocates a node whose span covers all of its children.
    pub fn alloc_spanning(&mut self, kind: NodeKind) -> NodeId {
        let span = kind
            .children()
            .iter()
            .map(|c| self.span(*c))
            .try_fold(None::<Span>, |acc, span| {
                let span = span?;
                Some(Some(acc.map_or(span, |a| a.cover(&span))))
            })
            .flatten();
        let id = self.alloc(kind);
        if let Some(span) = span {
            self.set_span(id, span);
        }
        id
    }

    pub fn truncate(&mut self, len: usize) {
        self.slots.truncate(len);
    }

    /// Records a span unless the node already has one.
    pub fn set_span(&mut self, id: NodeId, span: Span) -> bool {
        match self.slots.get_mut(id.index()) {
            Some(slot) if slot.span.is_none() => {
                slot.span = Some(span);
                true
            }
            _ => false,
        }
    }

    pub fn span(&self, id: NodeId) -> Option<Span> {
        self.slots.get(id.index()).and_then(|s| s.span)
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.slots[id.index()].kind
    }

    #[cfg(test)]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(id.index()).and_then(|s| s.parent)
    }

    /// Re-parents `child` under `parent`, for containers filled after allocation.
    pub fn adopt(&mut self, parent: NodeId, child: NodeId) {
        if let Some(slot) = self.slots.get_mut(child.index()) {
            slot.parent = Some(parent);
        }
    }

    /// Keeps only what `root` reaches and freezes it into a [`Story`].
    pub fn into_story(self, root: NodeId, root_span: Span, file: Option<String>) -> Story {
        let mut slots: Vec<Option<Slot>> = self.slots.into_iter().map(Some).collect();
        let mut remap: Vec<Option<NodeId>> = vec![None; slots.len()];
        let mut order: Vec<(NodeId, Option<NodeId>)> = Vec::new();

        // Pre-order walk, recording each node's new parent.
        let mut stack = vec![(root, None)];
        while let Some((old, new_parent)) = stack.pop() {
            if old.index() >= slots.len() || remap[old.index()].is_some() {
                continue;
            }
            let new_id = NodeId::from_index(order.len());
            remap[old.index()] = Some(new_id);
            order.push((old, new_parent));
            if let Some(slot) = &slots[old.index()] {
                for child in slot.kind.children().into_iter().rev() {
                    stack.push((child, Some(new_id)));
                }
            }
        }

        let mut nodes: Vec<Node> = Vec::with_capacity(order.len());
        for (old, parent) in order {
            let Some(mut slot) = slots[old.index()].take() else {
                continue;
            };
            slot.kind
                .remap_children(&mut |id| remap.get(id.index()).copied().flatten().unwrap_or(id));
            if let NodeKind::Gather { rejoins, .. } = &mut slot.kind {
                *rejoins = rejoins
                    .iter()
                    .filter_map(|id| remap.get(id.index()).copied().flatten())
                    .collect();
            }
            let span = match (slot.span, parent) {
                (Some(span), _) => span,
                (None, Some(parent)) => nodes[parent.index()].span,
                (None, None) => root_span,
            };
            nodes.push(Node {
                kind: slot.kind,
                parent,
                span,
            });
        }
        if let Some(root) = nodes.first_mut() {
            root.span = root_span;
        }

        Story {
            file,
            nodes,
            root: NodeId::from_index(0),
        }
    }
}

impl NodeLookup for Arena {
    fn kind(&self, id: NodeId) -> &NodeKind {
        &self.slots[id.index()].kind
    }
}

// ============================================================================
// FINISHED TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub span: Span,
}

/// A parsed file. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Story {
    file: Option<String>,
    nodes: Vec<Node>,
    root: NodeId,
}

impl Story {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// All nodes, in pre-order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Panics if `id` does not belong to this story.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).kind.children()
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Every node below `id`, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    /// Ids of every node matching `predicate`, in pre-order.
    pub fn find_all(&self, predicate: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| predicate(&n.kind))
            .map(|(i, _)| NodeId::from_index(i))
            .collect()
    }

    /// Top-level content of the root.
    pub fn content(&self) -> &[NodeId] {
        match &self.node(self.root).kind {
            NodeKind::Story { content } => content,
            _ => &[],
        }
    }

    /// The root weave holding the story's top-level content.
    pub fn root_weave(&self) -> Option<NodeId> {
        self.content()
            .iter()
            .copied()
            .find(|id| matches!(self.kind(*id), NodeKind::Weave { .. }))
    }

    /// Text of a `Text` node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Name of an `Identifier` node.
    pub fn identifier(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Identifier { name } => Some(name),
            _ => None,
        }
    }

    /// Dotted form of a path, variable reference or divert target.
    pub fn dotted_name(&self, id: NodeId) -> Option<String> {
        let parts = match &self.node(id).kind {
            NodeKind::Path { components } => components,
            NodeKind::VariableReference { path } => path,
            NodeKind::Divert {
                target: Some(target),
                ..
            } => return self.dotted_name(*target),
            NodeKind::Identifier { name } => return Some(name.clone()),
            _ => return None,
        };
        let names: Option<Vec<&str>> = parts.iter().map(|p| self.identifier(*p)).collect();
        names.map(|n| n.join("."))
    }

    /// Finds a knot, or a stitch as `knot.stitch`.
    pub fn flow(&self, dotted: &str) -> Option<NodeId> {
        let mut parts = dotted.split('.');
        let knot_name = parts.next()?;
        let mut current = self.content().iter().copied().find(|id| self.flow_named(*id, knot_name))?;
        for part in parts {
            let NodeKind::Flow { content, .. } = self.kind(current) else {
                return None;
            };
            current = content.iter().copied().find(|id| self.flow_named(*id, part))?;
        }
        Some(current)
    }

    fn flow_named(&self, id: NodeId, wanted: &str) -> bool {
        match self.kind(id) {
            NodeKind::Flow { name, .. } => self.identifier(*name) == Some(wanted),
            _ => false,
        }
    }

    /// Stories pulled in by `INCLUDE`, in source order.
    pub fn included_stories(&self) -> Vec<&Story> {
        self.nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::IncludedFile { story: Some(story) } => Some(story.as_ref()),
                _ => None,
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl NodeLookup for Story {
    fn kind(&self, id: NodeId) -> &NodeKind {
        Story::kind(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(a: usize, b: usize) -> Span {
        Span::new(
            Position {
                offset: a,
                line: 1,
                column: a + 1,
            },
            Position {
                offset: b,
                line: 1,
                column: b + 1,
            },
        )
    }

    fn text(arena: &mut Arena, s: &str) -> NodeId {
        arena.alloc(NodeKind::Text { text: s.into() })
    }

    #[test]
    fn test_first_span_wins() {
        let mut arena = Arena::default();
        let id = text(&mut arena, "a");
        assert!(arena.set_span(id, span(2, 3)));
        assert!(!arena.set_span(id, span(0, 9)));
        assert_eq!(arena.span(id), Some(span(2, 3)));
    }

    #[test]
    fn test_alloc_adopts_children() {
        let mut arena = Arena::default();
        let a = text(&mut arena, "a");
        let b = text(&mut arena, "b");
        let list = arena.alloc(NodeKind::ContentList { content: vec![a, b] });
        assert_eq!(arena.parent(a), Some(list));
        assert_eq!(arena.parent(b), Some(list));
    }

    #[test]
    fn test_spanning_alloc_covers_children() {
        let mut arena = Arena::default();
        let a = text(&mut arena, "a");
        let b = text(&mut arena, "b");
        arena.set_span(a, span(0, 1));
        arena.set_span(b, span(4, 5));
        let bin = arena.alloc_spanning(NodeKind::Binary {
            left: a,
            op: BinaryOp::Add,
            right: b,
        });
        assert_eq!(arena.span(bin), Some(span(0, 5)));
    }

    #[test]
    fn test_into_story_drops_unreachable_and_fills_spans() {
        let mut arena = Arena::default();
        let _garbage = text(&mut arena, "dropped");
        let a = text(&mut arena, "kept");
        let list = arena.alloc(NodeKind::ContentList { content: vec![a] });
        arena.set_span(list, span(0, 4));
        let root = arena.alloc(NodeKind::Story {
            content: vec![list],
        });
        let story = arena.into_story(root, span(0, 10), Some("main.ink".into()));

        assert_eq!(story.len(), 3);
        assert_eq!(story.root().index(), 0);
        let list = story.content()[0];
        let kept = story.children(list)[0];
        assert_eq!(story.text(kept), Some("kept"));
        assert_eq!(story.parent(kept), Some(list));
        assert_eq!(story.span(kept), span(0, 4));
        assert_eq!(story.span(story.root()), span(0, 10));
        assert_eq!(story.ancestors(kept).collect::<Vec<_>>(), vec![list, story.root()]);
    }
}
