//! Element-tree capability interface.
//!
//! The engine never owns the document it styles. The host application
//! supplies this capability for whatever tree representation it uses
//! (an XML DOM, a figure hierarchy, a widget tree); everything the matcher
//! and the function processor need to know about an element flows through
//! here.

/// Read access to an element tree.
pub trait SelectorModel {
    /// Handle to one element of the tree; cheap to clone.
    type Element: Clone;

    /// The element's local tag name.
    fn tag_name(&self, element: &Self::Element) -> String;

    /// The element's namespace URI, if it has one.
    fn namespace_uri(&self, element: &Self::Element) -> Option<String>;

    /// An attribute value, if the attribute is present.
    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    /// Whether the element carries the given style class.
    fn has_class(&self, element: &Self::Element, name: &str) -> bool;

    /// The element's id, if it has one.
    fn id(&self, element: &Self::Element) -> Option<String>;

    /// The parent element; `None` for the root.
    fn parent(&self, element: &Self::Element) -> Option<Self::Element>;

    /// The element's child elements, in document order.
    fn children(&self, element: &Self::Element) -> Vec<Self::Element>;

    /// 0-based index among the parent's children; `None` for the root.
    fn child_index(&self, element: &Self::Element) -> Option<usize>;
}

/// Writable extension used by the applier to store matched declarations.
pub trait WritableSelectorModel: SelectorModel {
    /// Set an attribute on the element, replacing any previous value.
    fn set_attribute(&mut self, element: &Self::Element, name: &str, value: &str);
}

#[cfg(test)]
pub(crate) mod mock {
    //! A small arena-backed document used by unit tests across the crate.

    use super::{SelectorModel, WritableSelectorModel};

    #[derive(Debug, Default)]
    struct Node {
        tag: String,
        namespace: Option<String>,
        attributes: Vec<(String, String)>,
        parent: Option<usize>,
        children: Vec<usize>,
    }

    /// Element handles are plain indexes into the arena.
    #[derive(Debug, Default)]
    pub struct Doc {
        nodes: Vec<Node>,
    }

    impl Doc {
        /// Create a document with a root element; the root's handle is 0.
        pub fn with_root(tag: &str) -> Self {
            let mut doc = Doc::default();
            doc.nodes.push(Node {
                tag: tag.to_string(),
                ..Default::default()
            });
            doc
        }

        pub fn append(&mut self, parent: usize, tag: &str) -> usize {
            self.append_ns(parent, tag, None)
        }

        pub fn append_ns(&mut self, parent: usize, tag: &str, namespace: Option<&str>) -> usize {
            let id = self.nodes.len();
            self.nodes.push(Node {
                tag: tag.to_string(),
                namespace: namespace.map(str::to_string),
                parent: Some(parent),
                ..Default::default()
            });
            self.nodes[parent].children.push(id);
            id
        }

        pub fn set(&mut self, element: usize, name: &str, value: &str) {
            let attributes = &mut self.nodes[element].attributes;
            if let Some(slot) = attributes.iter_mut().find(|(n, _)| n == name) {
                slot.1 = value.to_string();
            } else {
                attributes.push((name.to_string(), value.to_string()));
            }
        }

        pub fn attr(&self, element: usize, name: &str) -> Option<&str> {
            self.nodes[element]
                .attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        }
    }

    impl SelectorModel for Doc {
        type Element = usize;

        fn tag_name(&self, element: &usize) -> String {
            self.nodes[*element].tag.clone()
        }

        fn namespace_uri(&self, element: &usize) -> Option<String> {
            self.nodes[*element].namespace.clone()
        }

        fn attribute(&self, element: &usize, name: &str) -> Option<String> {
            self.attr(*element, name).map(str::to_string)
        }

        fn has_class(&self, element: &usize, name: &str) -> bool {
            self.attr(*element, "class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == name))
        }

        fn id(&self, element: &usize) -> Option<String> {
            self.attr(*element, "id").map(str::to_string)
        }

        fn parent(&self, element: &usize) -> Option<usize> {
            self.nodes[*element].parent
        }

        fn children(&self, element: &usize) -> Vec<usize> {
            self.nodes[*element].children.clone()
        }

        fn child_index(&self, element: &usize) -> Option<usize> {
            let parent = self.nodes[*element].parent?;
            self.nodes[parent].children.iter().position(|c| c == element)
        }
    }

    impl WritableSelectorModel for Doc {
        fn set_attribute(&mut self, element: &usize, name: &str, value: &str) {
            self.set(*element, name, value);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn tree_navigation() {
            let mut doc = Doc::with_root("xml");
            let a = doc.append(0, "a");
            let b = doc.append(0, "b");
            doc.set(b, "class", "one two");
            doc.set(b, "id", "second");

            assert_eq!(doc.tag_name(&a), "a");
            assert_eq!(doc.parent(&b), Some(0));
            assert_eq!(doc.child_index(&a), Some(0));
            assert_eq!(doc.child_index(&b), Some(1));
            assert_eq!(doc.child_index(&0), None);
            assert!(doc.has_class(&b, "two"));
            assert!(!doc.has_class(&b, "three"));
            assert_eq!(doc.id(&b).as_deref(), Some("second"));
            assert_eq!(doc.children(&0), vec![a, b]);
        }
    }
}
