//! Relation resolution by foreign-key equality.

use strata_common::types::Record;

use crate::schema::RelationDefinition;
use crate::state::DatabaseState;

/// Finds the records related to `owner` through `relation`.
///
/// Reads `owner[on]` and returns every record of the target table whose
/// `[references]` column holds an equal value, in table order. Empty when
/// the owner lacks the column or the target table is absent. Both relation
/// kinds scan the same way; the caller takes the first element for `One`.
pub fn resolve<'s>(
    state: &'s DatabaseState,
    owner: &Record,
    relation: &RelationDefinition,
) -> Vec<&'s Record> {
    let Some(key) = owner.get(relation.on()) else {
        return Vec::new();
    };
    let Some(target) = state.table(relation.target_table()) else {
        return Vec::new();
    };

    target
        .records
        .iter()
        .filter(|candidate| candidate.get(relation.references()) == Some(key))
        .collect()
}
