//! Command execution against an open catalog.

use datacat_core::{CatalogService, Error, HierarchyQuery, SimpleRelationType};
use tracing::debug;

use crate::config::{CliConfig, Command};
use crate::error::CliError;
use crate::formatter::Formatter;

/// Execute one command and render its result.
pub fn execute(
    service: &CatalogService,
    config: &CliConfig,
    command: Command,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    debug!(command = ?command, "Executing command");

    match command {
        Command::Import { file } => {
            let json = std::fs::read_to_string(&file)?;
            let summary = service.import_json(&json)?;
            service.store().flush()?;
            Ok(formatter.format_import(&summary))
        }

        Command::Show { id } => {
            let record = service
                .load(&id)?
                .ok_or_else(|| Error::not_found("catalog", id.as_str()))?;
            let name = service.name(&id, None)?;
            Ok(formatter.format_record(&record, name.as_ref()))
        }

        Command::Relate {
            id,
            relation,
            targets,
        } => {
            let relation: SimpleRelationType = relation.parse()?;
            let outcome = service.set_related_records(&id, targets.as_slice(), relation)?;
            service.store().flush()?;
            Ok(formatter.format_outcome(&outcome))
        }

        Command::Clear { id, relation } => {
            let relation: SimpleRelationType = relation.parse()?;
            let outcome = service.clear_relation(&id, relation)?;
            service.store().flush()?;
            Ok(formatter.format_outcome(&outcome))
        }

        Command::Search { filter } => {
            let page = service.find_all(&filter.to_spec(config.page_size)?)?;
            Ok(formatter.format_page(&page))
        }

        Command::Count { filter } => {
            let count = service.count(&filter.to_spec(config.page_size)?)?;
            Ok(formatter.format_count(count))
        }

        Command::Hierarchy { filter, relations } => {
            let mut query = HierarchyQuery::new(filter.to_spec(config.page_size)?)
                .with_max_depth(config.hierarchy_depth);
            if !relations.is_empty() {
                let relations = relations
                    .iter()
                    .map(|r| r.parse::<SimpleRelationType>())
                    .collect::<Result<Vec<_>, _>>()?;
                query = query.with_relations(relations);
            }
            let tree = service.get_hierarchy(&query)?;
            Ok(formatter.format_hierarchy(&tree))
        }

        Command::Translate { bundle_id } => {
            if !service.store().contains(&bundle_id)? {
                return Err(Error::not_found("XtdMultiLanguageText", bundle_id.as_str()).into());
            }
            let text = service.resolve(None, &bundle_id)?;
            Ok(formatter.format_text(&bundle_id, text.as_ref()))
        }

        Command::MissingDescriptions { filter } => {
            let page = service.find_missing_descriptions(&filter.to_spec(config.page_size)?)?;
            Ok(formatter.format_page(&page))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterArgs;
    use crate::formatter::JsonFormatter;
    use std::io::Write;

    const SEED: &str = r#"{
        "records": [
            { "id": "lang-en", "kind": "Language", "major_version": 1, "minor_version": 1,
              "payload": { "Language": { "code": "en" } } },
            { "id": "wall", "kind": "Subject", "major_version": 1, "minor_version": 1 },
            { "id": "height", "kind": "Property", "major_version": 1, "minor_version": 1 }
        ],
        "translations": [
            { "record": "wall", "relation": "Names", "text_id": "wall-en", "language": "en", "value": "Wall" }
        ],
        "relations": [
            { "record": "wall", "relation": "PROPERTIES", "targets": ["height"] }
        ]
    }"#;

    struct TestContext {
        service: CatalogService,
        config: CliConfig,
        dir: tempfile::TempDir,
    }

    impl TestContext {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = CliConfig::new(dir.path().join("catalog"));
            let service = CatalogService::open(config.storage_config())
                .unwrap()
                .with_priority_list(config.priority.clone());
            Self {
                service,
                config,
                dir,
            }
        }

        fn run(&self, command: Command) -> Result<serde_json::Value, CliError> {
            let output = execute(&self.service, &self.config, command, &JsonFormatter)?;
            Ok(serde_json::from_str(&output).unwrap())
        }

        fn import_seed(&self) {
            let path = self.dir.path().join("seed.json");
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(SEED.as_bytes()).unwrap();
            self.run(Command::Import { file: path }).unwrap();
        }
    }

    #[test]
    fn test_import_and_show() {
        let ctx = TestContext::new();
        ctx.import_seed();

        let shown = ctx.run(Command::Show { id: "wall".into() }).unwrap();
        assert_eq!(shown["name"]["value"], "Wall");
        assert_eq!(shown["record"]["outgoing"]["Properties"][0], "height");
    }

    #[test]
    fn test_relate_and_count() {
        let ctx = TestContext::new();
        ctx.import_seed();

        let outcome = ctx
            .run(Command::Relate {
                id: "height".into(),
                relation: "ReplacedObjects".into(),
                targets: vec!["wall".into()],
            })
            .unwrap();
        assert_eq!(outcome["outcome"], "applied");

        let count = ctx
            .run(Command::Count {
                filter: FilterArgs {
                    kinds: vec!["Concept".into()],
                    ..Default::default()
                },
            })
            .unwrap();
        assert_eq!(count["count"], 2);
    }

    #[test]
    fn test_unknown_relation_name() {
        let ctx = TestContext::new();
        ctx.import_seed();

        let result = ctx.run(Command::Clear {
            id: "wall".into(),
            relation: "Sideways".into(),
        });
        assert!(matches!(result, Err(CliError::Catalog(Error::InvalidData(_)))));
    }

    #[test]
    fn test_hierarchy_and_translate() {
        let ctx = TestContext::new();
        ctx.import_seed();

        let tree = ctx
            .run(Command::Hierarchy {
                filter: FilterArgs {
                    ids: vec!["wall".into()],
                    ..Default::default()
                },
                relations: Vec::new(),
            })
            .unwrap();
        assert_eq!(tree["paths"][0], serde_json::json!(["wall", "height"]));

        let text = ctx
            .run(Command::Translate {
                bundle_id: "wall.names".into(),
            })
            .unwrap();
        assert_eq!(text["text"]["value"], "Wall");

        let missing = ctx.run(Command::Translate {
            bundle_id: "nothing".into(),
        });
        assert!(matches!(missing, Err(CliError::Catalog(Error::NotFound { .. }))));
    }

    #[test]
    fn test_missing_import_file() {
        let ctx = TestContext::new();
        let result = ctx.run(Command::Import {
            file: ctx.dir.path().join("absent.json"),
        });
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
