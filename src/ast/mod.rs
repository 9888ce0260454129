use serde::Serialize;

/// Expression tree. Built once by the parser and never mutated; every node
/// owns its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub enum Node {
    /// Prefix operator: `-x`, `!x`, `not x`, `+x`
    Unary { operator: String, operand: Box<Node> },

    /// Infix operator, `operator` is the lexeme (`"+"`, `"and"`, `"=="`, ...)
    Binary {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// `receiver.name(args)`
    MethodCall {
        receiver: Box<Node>,
        name: String,
        args: Vec<Node>,
    },

    /// `name(args)`, resolved against the environment
    FunctionCall { name: String, args: Vec<Node> },

    /// `receiver.name`, also `receiver.0` for positional access
    Property { receiver: Box<Node>, name: String },

    Identifier { name: String },

    Bool { value: bool },

    Nil,

    Float { value: f64 },

    Int { value: i64 },

    String { value: String },

    /// `[a, b, c]`
    List { items: Vec<Node> },
}

impl Node {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Node::Unary { .. } => "Unary",
            Node::Binary { .. } => "Binary",
            Node::MethodCall { .. } => "MethodCall",
            Node::FunctionCall { .. } => "FunctionCall",
            Node::Property { .. } => "Property",
            Node::Identifier { .. } => "Identifier",
            Node::Bool { .. } => "Bool",
            Node::Nil => "Nil",
            Node::Float { .. } => "Float",
            Node::Int { .. } => "Int",
            Node::String { .. } => "String",
            Node::List { .. } => "List",
        }
    }

    // ---- Constructors, mostly for building trees by hand ----

    pub fn ident(name: impl Into<String>) -> Node {
        Node::Identifier { name: name.into() }
    }

    pub fn int(value: i64) -> Node {
        Node::Int { value }
    }

    pub fn float(value: f64) -> Node {
        Node::Float { value }
    }

    pub fn string(value: impl Into<String>) -> Node {
        Node::String { value: value.into() }
    }

    pub fn unary(operator: impl Into<String>, operand: Node) -> Node {
        Node::Unary { operator: operator.into(), operand: Box::new(operand) }
    }

    pub fn binary(operator: impl Into<String>, left: Node, right: Node) -> Node {
        Node::Binary {
            operator: operator.into(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn property(receiver: Node, name: impl Into<String>) -> Node {
        Node::Property { receiver: Box::new(receiver), name: name.into() }
    }

    pub fn call(name: impl Into<String>, args: Vec<Node>) -> Node {
        Node::FunctionCall { name: name.into(), args }
    }

    pub fn method(receiver: Node, name: impl Into<String>, args: Vec<Node>) -> Node {
        Node::MethodCall {
            receiver: Box::new(receiver),
            name: name.into(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_names() {
        assert_eq!(Node::Nil.variant_name(), "Nil");
        assert_eq!(Node::ident("a").variant_name(), "Identifier");
        assert_eq!(
            Node::binary("+", Node::int(1), Node::int(2)).variant_name(),
            "Binary"
        );
        assert_eq!(Node::List { items: vec![] }.variant_name(), "List");
    }

    #[test]
    fn constructors_box_children() {
        let node = Node::method(Node::ident("user"), "greet", vec![Node::string("hi")]);
        match node {
            Node::MethodCall { receiver, name, args } => {
                assert_eq!(*receiver, Node::ident("user"));
                assert_eq!(name, "greet");
                assert_eq!(args, vec![Node::String { value: "hi".into() }]);
            }
            other => panic!("expected MethodCall, got {:?}", other),
        }
    }

    #[test]
    fn node_serializes_with_variant_tag() {
        let node = Node::binary("-", Node::ident("a"), Node::int(1));
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("Binary"));
        assert!(json.contains("\"operator\":\"-\""));
    }

    #[test]
    fn node_json_round_trip() {
        let node = Node::call("max", vec![Node::float(1.5), Node::Nil, Node::Bool { value: true }]);
        let json = serde_json::to_string_pretty(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
