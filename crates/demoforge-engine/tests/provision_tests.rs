//! Stage-isolation tests for the resource provisioner.
//!
//! A scripted platform fails exactly the stages a test asks for, so each
//! transition rule of the pipeline can be exercised: mandatory failures
//! halt and skip, optional failures isolate, disabled stages leave no
//! record, and the agent's toolset degrades visibly.

use chrono::Utc;
use demoforge_engine::{
    allocate, generate, provision, resolve_names, AgentDef, GeneratedTable, Platform,
    PlatformError, ProvisionRequest, ProvisionedResource, ResourceKind, ResourceStatus, RunConfig,
    SearchIndexDef, SemanticViewDef,
};
use demoforge_spec::{plan, CanonicalSchema, ColumnSpec, DemoSpec, TableSpec};
use std::collections::HashSet;

// ============================================================================
// Scripted platform
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Call {
    Schema,
    Table,
    SemanticView,
    SearchIndex,
    Agent,
}

#[derive(Default)]
struct ScriptedPlatform {
    fail: HashSet<Call>,
    calls: Vec<Call>,
}

impl ScriptedPlatform {
    fn failing(calls: &[Call]) -> Self {
        Self {
            fail: calls.iter().copied().collect(),
            calls: Vec::new(),
        }
    }

    fn outcome(&mut self, call: Call, resource: &str) -> Result<(), PlatformError> {
        self.calls.push(call);
        if self.fail.contains(&call) {
            Err(PlatformError::Unavailable {
                resource: resource.to_string(),
                reason: "scripted failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl Platform for ScriptedPlatform {
    fn create_schema(&mut self, name: &str) -> Result<(), PlatformError> {
        self.outcome(Call::Schema, name)
    }

    fn create_table(&mut self, _schema: &str, table: &GeneratedTable) -> Result<(), PlatformError> {
        self.outcome(Call::Table, &table.name)
    }

    fn create_semantic_view(
        &mut self,
        _schema: &str,
        view: &SemanticViewDef,
    ) -> Result<(), PlatformError> {
        self.outcome(Call::SemanticView, &view.name)
    }

    fn create_search_index(
        &mut self,
        _schema: &str,
        index: &SearchIndexDef,
    ) -> Result<(), PlatformError> {
        self.outcome(Call::SearchIndex, &index.name)
    }

    fn create_agent(&mut self, _schema: &str, agent: &AgentDef) -> Result<(), PlatformError> {
        self.outcome(Call::Agent, &agent.name)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn column(name: &str, semantic: &str) -> ColumnSpec {
    ColumnSpec {
        name: name.to_string(),
        semantic_type: semantic.to_string(),
        sample_values: vec![],
        references: None,
    }
}

fn demo_spec() -> DemoSpec {
    DemoSpec {
        title: "demo".to_string(),
        description: String::new(),
        industry: "logistics".to_string(),
        tables: vec![
            TableSpec {
                name: "SHIPMENTS".to_string(),
                kind: "fact".to_string(),
                columns: vec![
                    column("SHIPMENT_ID", "identifier"),
                    ColumnSpec {
                        name: "CARRIER_ID".to_string(),
                        semantic_type: "foreign_key".to_string(),
                        sample_values: vec![],
                        references: Some(demoforge_spec::spec::ReferenceSpec {
                            table: "CARRIERS".to_string(),
                            column: "CARRIER_ID".to_string(),
                        }),
                    },
                    column("WEIGHT_KG", "numeric"),
                ],
                row_count: None,
            },
            TableSpec {
                name: "CARRIERS".to_string(),
                kind: "dimension".to_string(),
                columns: vec![
                    column("CARRIER_ID", "identifier"),
                    column("CARRIER_NAME", "categorical"),
                ],
                row_count: None,
            },
            TableSpec {
                name: "INCIDENT_REPORTS".to_string(),
                kind: "unstructured".to_string(),
                columns: vec![column("REPORT_TEXT", "free_text")],
                row_count: None,
            },
        ],
        target_questions: vec!["Which carrier loses the most shipments?".to_string()],
    }
}

struct Fixture {
    schema: CanonicalSchema,
    tables: Vec<GeneratedTable>,
}

fn fixture(config: &RunConfig) -> Fixture {
    let schema = plan(&demo_spec()).expect("valid spec");
    let keys = allocate(&schema, config, 21);
    let tables =
        generate(&schema, &keys, config, "Initech", Utc::now(), 22).expect("generation succeeds");
    Fixture { schema, tables }
}

fn run(config: &RunConfig, platform: &mut ScriptedPlatform) -> Vec<ProvisionedResource> {
    let fx = fixture(config);
    let names = resolve_names("Initech", Utc::now());
    provision(
        &ProvisionRequest {
            names: &names,
            organization: "Initech",
            schema: &fx.schema,
            tables: &fx.tables,
            config,
        },
        platform,
    )
}

fn status_of(resources: &[ProvisionedResource], kind: ResourceKind) -> ResourceStatus {
    resources
        .iter()
        .find(|r| r.kind == kind)
        .unwrap_or_else(|| panic!("no resource of kind {kind:?}"))
        .status
}

// ============================================================================
// Transition rules
// ============================================================================

#[test]
fn all_stages_created_on_a_clean_run() {
    let config = RunConfig::default();
    let mut platform = ScriptedPlatform::default();
    let resources = run(&config, &mut platform);

    assert_eq!(resources.len(), 5);
    for resource in &resources {
        assert_eq!(resource.status, ResourceStatus::Created, "{resource:?}");
    }
    // One create_table call per generated table, in pipeline position.
    assert_eq!(
        platform.calls,
        vec![
            Call::Schema,
            Call::Table,
            Call::Table,
            Call::Table,
            Call::SemanticView,
            Call::SearchIndex,
            Call::Agent,
        ]
    );
}

#[test]
fn tables_failure_skips_every_downstream_stage() {
    let config = RunConfig::default();
    let mut platform = ScriptedPlatform::failing(&[Call::Table]);
    let resources = run(&config, &mut platform);

    assert_eq!(status_of(&resources, ResourceKind::Schema), ResourceStatus::Created);
    assert_eq!(status_of(&resources, ResourceKind::Table), ResourceStatus::Failed);
    for kind in [
        ResourceKind::SemanticView,
        ResourceKind::SearchIndex,
        ResourceKind::Agent,
    ] {
        let resource = resources.iter().find(|r| r.kind == kind).expect("recorded");
        assert_eq!(resource.status, ResourceStatus::Skipped);
        assert_eq!(
            resource.detail.as_deref(),
            Some("blocked by prerequisite failure")
        );
    }
    // Nothing downstream was attempted against the platform.
    assert!(!platform.calls.contains(&Call::SemanticView));
    assert!(!platform.calls.contains(&Call::Agent));
}

#[test]
fn schema_failure_blocks_tables_too() {
    let config = RunConfig::default();
    let mut platform = ScriptedPlatform::failing(&[Call::Schema]);
    let resources = run(&config, &mut platform);

    assert_eq!(status_of(&resources, ResourceKind::Schema), ResourceStatus::Failed);
    assert_eq!(status_of(&resources, ResourceKind::Table), ResourceStatus::Skipped);
    assert_eq!(platform.calls, vec![Call::Schema]);
}

#[test]
fn search_index_failure_does_not_cascade_to_agent() {
    let config = RunConfig::default();
    let mut platform = ScriptedPlatform::failing(&[Call::SearchIndex]);
    let resources = run(&config, &mut platform);

    assert_eq!(
        status_of(&resources, ResourceKind::SearchIndex),
        ResourceStatus::Failed
    );
    // The agent stage still executes and reports its degraded toolset.
    let agent = resources
        .iter()
        .find(|r| r.kind == ResourceKind::Agent)
        .expect("agent recorded");
    assert_eq!(agent.status, ResourceStatus::Created);
    assert_eq!(
        agent.detail.as_deref(),
        Some("degraded toolset: search index unavailable")
    );
    assert!(platform.calls.contains(&Call::Agent));
}

#[test]
fn semantic_view_failure_is_isolated() {
    let config = RunConfig::default();
    let mut platform = ScriptedPlatform::failing(&[Call::SemanticView]);
    let resources = run(&config, &mut platform);

    assert_eq!(
        status_of(&resources, ResourceKind::SemanticView),
        ResourceStatus::Failed
    );
    assert_eq!(
        status_of(&resources, ResourceKind::SearchIndex),
        ResourceStatus::Created
    );
    assert_eq!(status_of(&resources, ResourceKind::Agent), ResourceStatus::Created);
}

#[test]
fn disabled_stages_leave_no_record() {
    let config = RunConfig {
        enable_semantic_view: false,
        enable_search_index: false,
        enable_agent: false,
        ..RunConfig::default()
    };
    let mut platform = ScriptedPlatform::default();
    let resources = run(&config, &mut platform);

    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0].kind, ResourceKind::Schema);
    assert_eq!(resources[0].status, ResourceStatus::Created);
    assert_eq!(resources[1].kind, ResourceKind::Table);
    assert_eq!(resources[1].status, ResourceStatus::Created);
}

#[test]
fn agent_is_skipped_when_no_tool_was_created() {
    // Both tool stages fail; the agent has nothing to orchestrate.
    let config = RunConfig::default();
    let mut platform = ScriptedPlatform::failing(&[Call::SemanticView, Call::SearchIndex]);
    let resources = run(&config, &mut platform);

    let agent = resources
        .iter()
        .find(|r| r.kind == ResourceKind::Agent)
        .expect("agent recorded");
    assert_eq!(agent.status, ResourceStatus::Skipped);
    assert_eq!(agent.detail.as_deref(), Some("no agent tools available"));
    assert!(!platform.calls.contains(&Call::Agent));
}

#[test]
fn agent_survives_with_search_index_only() {
    let config = RunConfig {
        enable_semantic_view: false,
        ..RunConfig::default()
    };
    let mut platform = ScriptedPlatform::default();
    let resources = run(&config, &mut platform);

    assert!(resources.iter().all(|r| r.kind != ResourceKind::SemanticView));
    let agent = resources
        .iter()
        .find(|r| r.kind == ResourceKind::Agent)
        .expect("agent recorded");
    assert_eq!(agent.status, ResourceStatus::Created);
    // Disabled-by-config tools are not "degraded"; no note expected.
    assert_eq!(agent.detail, None);
}
