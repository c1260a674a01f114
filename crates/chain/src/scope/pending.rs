use crate::Link;

/// Decorations declared in a scope and not yet attached to an operation.
#[derive(Debug, Default)]
pub(crate) enum Pending {
    #[default]
    Idle,
    Armed(Vec<Link>),
}

impl Pending {
    /// Idle -> Armed, or extends an existing Armed list
    pub(crate) fn arm(&mut self, link: Link) {
        match self {
            Pending::Idle => *self = Pending::Armed(vec![link]),
            Pending::Armed(links) => links.push(link),
        }
    }

    /// Consumes the armed links, leaving the state Idle
    pub(crate) fn take(&mut self) -> Vec<Link> {
        match std::mem::take(self) {
            Pending::Idle => Vec::new(),
            Pending::Armed(links) => links,
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        matches!(self, Pending::Armed(_))
    }

    pub(crate) fn names(&self) -> Vec<&str> {
        match self {
            Pending::Idle => Vec::new(),
            Pending::Armed(links) => links.iter().map(Link::name).collect(),
        }
    }
}
