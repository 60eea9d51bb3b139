pub(crate) mod path;
pub(crate) mod pattern;
pub(crate) mod radix_tree;
