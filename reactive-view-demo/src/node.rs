//! A tiny view tree and a renderer that prints it as text.

use std::fmt;

use reactive_view::Placeholder;

use crate::model::Image;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Node {
    /// Children stacked on top of each other.
    Stack(Vec<Node>),
    Text(String),
    Image(Image),
    List(Vec<Node>),
    /// Tapping `label` opens the detail screen of item `destination`.
    Link { label: Box<Node>, destination: usize },
    /// Stands in for the row of the item with this id until the list screen
    /// fills it in.
    Slot(usize),
    /// The root screen with the pushed screens on top.
    Navigation(Vec<Node>),
}

impl Placeholder for Node {
    fn placeholder() -> Self {
        Node::Stack(Vec::new())
    }
}

impl Node {
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    /// Replace every [`Node::Slot`] with the node `fill` returns for it.
    pub(crate) fn fill_slots(self, fill: &impl Fn(usize) -> Node) -> Node {
        let fill_all = |children: Vec<Node>| -> Vec<Node> {
            children.into_iter().map(|child| child.fill_slots(fill)).collect()
        };

        match self {
            Node::Slot(id) => fill(id),
            Node::Stack(children) => Node::Stack(fill_all(children)),
            Node::List(children) => Node::List(fill_all(children)),
            Node::Navigation(screens) => Node::Navigation(fill_all(screens)),
            Node::Link { label, destination } => {
                Node::Link { label: Box::new(label.fill_slots(fill)), destination }
            }
            leaf @ (Node::Text(_) | Node::Image(_)) => leaf,
        }
    }

    /// Find the link labeled `label` on the visible screen, like a user would
    /// before tapping it.
    pub(crate) fn find_link(&self, label: &str) -> Option<usize> {
        match self {
            Node::Link { label: inner, destination } => match &**inner {
                Node::Text(text) if text == label => Some(*destination),
                inner => inner.find_link(label),
            },
            Node::Stack(children) | Node::List(children) => {
                children.iter().find_map(|child| child.find_link(label))
            }
            Node::Navigation(screens) => screens.last()?.find_link(label),
            Node::Text(_) | Node::Image(_) | Node::Slot(_) => None,
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = depth * 2;
        match self {
            Node::Stack(children) if children.is_empty() => Ok(()),
            Node::Stack(children) => children.iter().try_for_each(|child| child.write(f, depth)),
            Node::Text(text) => writeln!(f, "{:indent$}{text}", ""),
            Node::Image(image) if image.is_fallback() => writeln!(f, "{:indent$}[no image]", ""),
            Node::Image(image) => {
                writeln!(f, "{:indent$}[image {}x{}]", "", image.width, image.height)
            }
            Node::List(rows) => {
                for row in rows {
                    write!(f, "{:indent$}- ", "")?;
                    row.write_inline(f, depth + 1)?;
                }
                Ok(())
            }
            Node::Link { label, .. } => {
                write!(f, "{:indent$}> ", "")?;
                label.write_inline(f, depth + 1)
            }
            Node::Slot(id) => writeln!(f, "{:indent$}<row {id}>", ""),
            // Only the top screen is visible.
            Node::Navigation(screens) => match screens.last() {
                Some(top) => top.write(f, depth),
                None => Ok(()),
            },
        }
    }

    /// Write a node that continues the current line.
    fn write_inline(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Node::Text(text) => writeln!(f, "{text}"),
            Node::Stack(children) if children.is_empty() => writeln!(f, "..."),
            Node::Link { label, .. } => {
                write!(f, "> ")?;
                label.write_inline(f, depth)
            }
            other => {
                writeln!(f)?;
                other.write(f, depth)
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, 0)
    }
}
