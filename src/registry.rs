use crate::entity::Entity;

/// The live set of fish. Retired entities stay in place during a tick and are
/// compacted out afterwards with [`Registry::take_retired`].
#[derive(Debug, Default)]
pub struct Registry {
    entities: Vec<Entity>,
    next_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn insert(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    /// Remove every retired entity, keeping the order of the rest.
    pub fn take_retired(&mut self) -> Vec<Entity> {
        let mut retired = Vec::new();
        let mut i = 0;
        while i < self.entities.len() {
            if self.entities[i].alive() {
                i += 1;
            } else {
                retired.push(self.entities.remove(i));
            }
        }
        retired
    }

    pub fn drain(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.entities)
    }
}
