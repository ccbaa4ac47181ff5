use crate::config::HarvestConfig;
use crate::request::filters::{combination_count, FormatFilter, MediaFilter, SortOrder, StarFilter};
use crate::request::spec::{EntityId, RequestSpec};
use crate::RequestResult;

/// Expands an entity into every page request of its review sweep
///
/// Planning is a pure function of the entity id, the static filter
/// enumerations and the configured page bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPlanner {
    max_pages: u32,
}

impl RequestPlanner {
    pub fn new(max_pages: u32) -> Self {
        Self { max_pages }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(config.max_pages)
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Number of requests planned for any single entity
    pub fn requests_per_entity(&self) -> usize {
        combination_count() * self.max_pages as usize
    }

    /// Validates `entity_id` and plans its sweep
    pub fn plan(&self, entity_id: &str) -> RequestResult<Vec<RequestSpec>> {
        let entity = EntityId::new(entity_id)?;
        Ok(self.plan_entity(&entity))
    }

    /// Plans the sweep for an already validated entity
    ///
    /// Specs nest sort, star, format, media, then page; pages run from 1.
    pub fn plan_entity(&self, entity: &EntityId) -> Vec<RequestSpec> {
        let mut specs = Vec::with_capacity(self.requests_per_entity());

        for sort in SortOrder::ALL {
            for star in StarFilter::ALL {
                for format in FormatFilter::ALL {
                    for media in MediaFilter::ALL {
                        for page in 1..=self.max_pages {
                            specs.push(RequestSpec {
                                entity: entity.clone(),
                                sort,
                                star,
                                format,
                                media,
                                page,
                            });
                        }
                    }
                }
            }
        }

        specs
    }
}
