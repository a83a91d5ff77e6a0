//! Early cross-reference validation of a parsed configuration.
//!
//! Misconfigurations that the pipeline would otherwise only hit mid-run (or
//! worse, silently misapply) are rejected here, before any query is issued.

use crate::datasets::DataSets;
use crate::error::{EkgError, EkgResult};
use crate::header::model::EntityConstructor;
use crate::header::SemanticHeader;

/// Validate a semantic header against the dataset declarations.
pub fn validate(header: &SemanticHeader, datasets: &DataSets) -> EkgResult<()> {
    validate_structures(datasets)?;
    validate_header(header)?;
    Ok(())
}

fn validate_structures(datasets: &DataSets) -> EkgResult<()> {
    for structure in &datasets.structures {
        for attribute in &structure.attributes {
            // A paired fallback column list must line up one-to-one with the
            // source columns; zipping mismatched lists silently pairs the
            // wrong columns.
            if !attribute.na_rep_columns.is_empty()
                && attribute.na_rep_columns.len() != attribute.columns.len()
            {
                return Err(EkgError::validation(format!(
                    "table '{}', attribute '{}': na_rep_columns has {} entries but \
                     columns has {}",
                    structure.name,
                    attribute.name,
                    attribute.na_rep_columns.len(),
                    attribute.columns.len()
                )));
            }

            if attribute.is_compound() && attribute.separator.is_none() {
                return Err(EkgError::validation(format!(
                    "table '{}', attribute '{}': compound attribute without a separator",
                    structure.name, attribute.name
                )));
            }

            if attribute.columns.is_empty() {
                return Err(EkgError::validation(format!(
                    "table '{}', attribute '{}': no source columns declared",
                    structure.name, attribute.name
                )));
            }
        }

        for sample in structure.samples.values() {
            if sample.use_random_sample && sample.size == 0 {
                return Err(EkgError::validation(format!(
                    "table '{}', sample for '{}': random sample with size 0",
                    structure.name, sample.file_name
                )));
            }
            if !sample.use_random_sample && sample.ids.is_empty() {
                return Err(EkgError::validation(format!(
                    "table '{}', sample for '{}': explicit sample without ids",
                    structure.name, sample.file_name
                )));
            }
        }
    }
    Ok(())
}

fn validate_header(header: &SemanticHeader) -> EkgResult<()> {
    for relation in &header.relations {
        for endpoint in [&relation.from_node_label, &relation.to_node_label] {
            if header.entity(endpoint).is_none() {
                return Err(EkgError::UnknownEntity(format!(
                    "relation '{}' references entity '{}'",
                    relation.rel_type, endpoint
                )));
            }
        }
    }

    for entity in &header.entities {
        if let EntityConstructor::Relation { relation_type, .. } = &entity.constructed_by {
            if header.relation(relation_type).is_none() {
                return Err(EkgError::UnknownRelation(format!(
                    "reified entity '{}' references relation '{}'",
                    entity.entity_type, relation_type
                )));
            }
        }

        // delete_parallel_df compares the reified entity's DF edges against
        // its endpoint entities; a node-constructed entity has no endpoints.
        if entity.delete_parallel_df && !entity.is_reified() {
            return Err(EkgError::validation(format!(
                "entity '{}': delete_parallel_df only applies to entities \
                 constructed from relations",
                entity.entity_type
            )));
        }
    }

    for class in &header.classes {
        if class.class_identifiers.is_empty() {
            return Err(EkgError::validation(
                "class with empty class_identifiers".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_datasets() -> DataSets {
        DataSets::from_json_str("[]").unwrap()
    }

    #[test]
    fn na_rep_length_mismatch_is_fatal() {
        let datasets = DataSets::from_json_str(
            r#"[{
                "name": "T", "file_directory": "d", "file_names": [], "labels": ["Event"],
                "attributes": [{
                    "name": "a",
                    "columns": [{"name": "x"}, {"name": "y"}],
                    "separator": "-",
                    "na_rep_columns": [{"name": "z"}]
                }]
            }]"#,
        )
        .unwrap();
        let header = SemanticHeader::from_json_str(r#"{"name": "X"}"#).unwrap();
        let err = validate(&header, &datasets).unwrap_err();
        assert!(matches!(err, EkgError::ValidationError(_)));
    }

    #[test]
    fn relation_endpoints_must_exist() {
        let header = SemanticHeader::from_json_str(
            r#"{
                "name": "X",
                "entities": [{
                    "type": "Offer", "primary_keys": ["OfferID"],
                    "constructed_by_node": {"node_label": "Event"}
                }],
                "relations": [{
                    "type": "AO", "from_node_label": "Application",
                    "to_node_label": "Offer", "foreign_key": "case"
                }]
            }"#,
        )
        .unwrap();
        let err = validate(&header, &empty_datasets()).unwrap_err();
        assert!(matches!(err, EkgError::UnknownEntity(_)));
    }

    #[test]
    fn reified_entity_needs_declared_relation() {
        let header = SemanticHeader::from_json_str(
            r#"{
                "name": "X",
                "entities": [{
                    "type": "CaseAO", "primary_keys": ["id"],
                    "constructed_by_relation": {"relation_type": "AO"}
                }]
            }"#,
        )
        .unwrap();
        let err = validate(&header, &empty_datasets()).unwrap_err();
        assert!(matches!(err, EkgError::UnknownRelation(_)));
    }

    #[test]
    fn valid_config_passes() {
        let header = SemanticHeader::from_json_str(
            r#"{
                "name": "X",
                "entities": [
                    {"type": "Application", "primary_keys": ["case"], "corr": true,
                     "constructed_by_node": {"node_label": "Event"}},
                    {"type": "Offer", "primary_keys": ["OfferID"], "corr": true,
                     "constructed_by_node": {"node_label": "Event"}}
                ],
                "relations": [{
                    "type": "AO", "from_node_label": "Application",
                    "to_node_label": "Offer", "foreign_key": "case"
                }],
                "classes": [{"class_identifiers": ["Activity"]}]
            }"#,
        )
        .unwrap();
        validate(&header, &empty_datasets()).unwrap();
    }
}
