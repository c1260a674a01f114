/// One benchmarked chain: an operation wrapped in `depth` decorations.
#[derive(Debug, Copy, Clone)]
pub struct BenchCase {
    name: &'static str,
    group: BenchGroup,
    depth: usize,
}

impl BenchCase {
    pub fn new(name: &'static str, group: BenchGroup, depth: usize) -> Self {
        Self { name, group, depth }
    }

    pub fn shallow(name: &'static str, depth: usize) -> Self {
        Self::new(name, BenchGroup::Shallow, depth)
    }

    pub fn deep(name: &'static str, depth: usize) -> Self {
        Self::new(name, BenchGroup::Deep, depth)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> BenchGroup {
        self.group
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[derive(Clone, Copy, Debug)]
pub enum BenchGroup {
    Shallow,
    Deep,
}
