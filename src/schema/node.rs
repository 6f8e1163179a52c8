/// Scalar payload carried by a [`SchemaNode`].
///
/// Mirrors the value kinds of the binary KeyValues format. Subtree nodes carry
/// [`SchemaValue::None`] and expose their entries through
/// [`SchemaNode::children`].
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaValue {
    None,
    String(String),
    WideString(String),
    Int32(i32),
    Float32(f32),
    Pointer(u32),
    Color(u32),
    UInt64(u64),
}

/// Sentinel returned by lookups that find nothing.
///
/// Every accessor on it yields the caller's default, so chained lookups such as
/// `node.get("display").get("name")` never need optional plumbing.
static INVALID: SchemaNode = SchemaNode {
    name: String::new(),
    value: SchemaValue::None,
    children: Vec::new(),
    valid: false,
};

/// One node of the vendor schema tree.
///
/// Children are kept in file order. Name lookups are case-insensitive, which
/// is how the vendor client resolves keys as well.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    name: String,
    value: SchemaValue,
    children: Vec<SchemaNode>,
    valid: bool,
}

impl SchemaNode {
    /// Create a valid leaf node.
    pub fn leaf(name: impl Into<String>, value: SchemaValue) -> Self {
        Self {
            name: name.into(),
            value,
            children: Vec::new(),
            valid: true,
        }
    }

    /// Create a valid subtree node.
    pub fn tree(name: impl Into<String>, children: Vec<SchemaNode>) -> Self {
        Self {
            name: name.into(),
            value: SchemaValue::None,
            children,
            valid: true,
        }
    }

    /// The shared invalid node.
    pub fn invalid() -> &'static SchemaNode {
        &INVALID
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &SchemaValue {
        &self.value
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn children(&self) -> &[SchemaNode] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub(crate) fn push_child(&mut self, child: SchemaNode) {
        self.children.push(child);
    }

    /// First child whose name matches `name` ignoring ASCII case.
    pub fn child_by_name(&self, name: &str) -> Option<&SchemaNode> {
        if !self.valid {
            return None;
        }
        self.children
            .iter()
            .find(|child| child.name.eq_ignore_ascii_case(name))
    }

    pub fn child_by_index(&self, index: usize) -> Option<&SchemaNode> {
        if !self.valid {
            return None;
        }
        self.children.get(index)
    }

    /// Like [`child_by_name`](Self::child_by_name) but falls back to the
    /// invalid sentinel.
    pub fn get(&self, name: &str) -> &SchemaNode {
        self.child_by_name(name).unwrap_or(&INVALID)
    }

    /// Value rendered as a string. Subtrees and invalid nodes yield `default`.
    pub fn as_string(&self, default: &str) -> String {
        if !self.valid {
            return default.to_string();
        }
        match &self.value {
            SchemaValue::None => default.to_string(),
            SchemaValue::String(s) | SchemaValue::WideString(s) => s.clone(),
            SchemaValue::Int32(v) => v.to_string(),
            SchemaValue::Float32(v) => v.to_string(),
            SchemaValue::Pointer(v) | SchemaValue::Color(v) => v.to_string(),
            SchemaValue::UInt64(v) => v.to_string(),
        }
    }

    pub fn as_integer(&self, default: i32) -> i32 {
        if !self.valid {
            return default;
        }
        match &self.value {
            SchemaValue::String(s) | SchemaValue::WideString(s) => {
                s.trim().parse().unwrap_or(default)
            }
            SchemaValue::Int32(v) => *v,
            SchemaValue::Float32(v) => *v as i32,
            // Low 32 bits, reinterpreted as signed.
            SchemaValue::UInt64(v) => (*v & 0xFFFF_FFFF) as u32 as i32,
            SchemaValue::Pointer(v) | SchemaValue::Color(v) => *v as i32,
            SchemaValue::None => default,
        }
    }

    pub fn as_float(&self, default: f32) -> f32 {
        if !self.valid {
            return default;
        }
        match &self.value {
            SchemaValue::String(s) | SchemaValue::WideString(s) => {
                s.trim().parse().unwrap_or(default)
            }
            SchemaValue::Int32(v) => *v as f32,
            SchemaValue::Float32(v) => *v,
            SchemaValue::UInt64(v) => *v as f32,
            SchemaValue::Pointer(_) | SchemaValue::Color(_) | SchemaValue::None => default,
        }
    }

    pub fn as_boolean(&self, default: bool) -> bool {
        if !self.valid {
            return default;
        }
        match &self.value {
            SchemaValue::String(s) | SchemaValue::WideString(s) => s
                .trim()
                .parse::<i32>()
                .map(|v| v != 0)
                .unwrap_or(default),
            SchemaValue::Int32(v) => *v != 0,
            SchemaValue::Float32(v) => *v != 0.0,
            SchemaValue::UInt64(v) => *v != 0,
            SchemaValue::Pointer(v) | SchemaValue::Color(v) => *v != 0,
            SchemaValue::None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SchemaNode {
        SchemaNode::tree(
            "root",
            vec![
                SchemaNode::leaf("Name", SchemaValue::String("ACH_WIN".to_string())),
                SchemaNode::leaf("count", SchemaValue::Int32(12)),
                SchemaNode::leaf("ratio", SchemaValue::Float32(2.5)),
                SchemaNode::leaf("numeric_text", SchemaValue::String("42".to_string())),
                SchemaNode::tree("display", vec![]),
            ],
        )
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let root = sample();
        assert_eq!(root.get("name").as_string(""), "ACH_WIN");
        assert_eq!(root.get("NAME").as_string(""), "ACH_WIN");
        assert!(root.child_by_name("missing").is_none());
    }

    #[test]
    fn test_chained_lookup_on_missing_nodes() {
        let root = sample();
        let node = root.get("nope").get("deeper").get("deepest");
        assert!(!node.is_valid());
        assert_eq!(node.as_string("fallback"), "fallback");
        assert_eq!(node.as_integer(-7), -7);
        assert!(node.as_boolean(true));
    }

    #[test]
    fn test_numeric_coercions() {
        let root = sample();
        assert_eq!(root.get("count").as_integer(0), 12);
        assert_eq!(root.get("count").as_float(0.0), 12.0);
        assert_eq!(root.get("ratio").as_integer(0), 2);
        assert_eq!(root.get("numeric_text").as_integer(0), 42);
        assert!(root.get("count").as_boolean(false));
        assert_eq!(root.get("name").as_integer(5), 5);
    }

    #[test]
    fn test_subtree_has_no_scalar_value() {
        let root = sample();
        let display = root.get("display");
        assert!(display.is_valid());
        assert_eq!(display.as_string("x"), "x");
    }

    #[test]
    fn test_child_by_index() {
        let root = sample();
        assert_eq!(root.child_by_index(1).map(SchemaNode::name), Some("count"));
        assert!(root.child_by_index(99).is_none());
    }
}
