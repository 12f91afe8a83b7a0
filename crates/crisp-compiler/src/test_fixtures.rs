//! Shared fixtures for compiler tests: a representative context schema and
//! the full front-half pipeline in one call.

use crisp_core::DynamicSchema;

use crate::analyze::{self, SemanticModel};
use crate::ast::{self, Program};
use crate::diagnostics::Diagnostics;
use crate::parser::parse;

/// A game-agent schema exercising every descriptor feature: properties,
/// fields, methods with overloads, inheritance, nullability annotations,
/// an obsolete member, an enum, a generic type, and a blackboard type.
pub const AGENT_SCHEMA_JSON: &str = r#"{
    "context": "Agent",
    "types": [
        {
            "name": "Agent",
            "members": [
                {"name": "Health", "kind": "Property", "type": "Float"},
                {"name": "Stamina", "kind": "Property", "type": "Int"},
                {"name": "Name", "kind": "Field", "type": "String"},
                {"name": "IsAlive", "kind": "Property", "type": "Bool"},
                {"name": "isAlive", "kind": "Property", "type": "Bool"},
                {"name": "Stance", "kind": "Property", "type": "Stance"},
                {"name": "Target", "kind": "Property", "type": "Enemy", "nullable": "Annotated"},
                {"name": "Home", "kind": "Property", "type": "Vec2", "nullable": "NotAnnotated"},
                {"name": "Pack", "kind": "Property", "type": "Inventory<Enemy>"},
                {"name": "BadPack", "kind": "Property", "type": "Inventory<Stance>"},
                {"name": "Flee", "kind": "Method", "type": "BtStatus"},
                {"name": "Patrol", "kind": "Method", "type": "BtStatus"},
                {"name": "Act", "kind": "Method", "type": "BtStatus"},
                {"name": "Cry", "kind": "Method", "type": "Void"},
                {"name": "OldWay", "kind": "Method", "type": "BtStatus",
                 "obsolete": "use Patrol instead"},
                {"name": "Say", "kind": "Method", "type": "BtStatus",
                 "params": [{"name": "text", "type": "String"}]},
                {"name": "MoveTo", "kind": "Method", "type": "BtStatus",
                 "params": [{"name": "x", "type": "Float"}, {"name": "y", "type": "Float"}]},
                {"name": "MoveTo", "kind": "Method", "type": "BtStatus",
                 "params": [{"name": "position", "type": "Vec2"}]},
                {"name": "Attack", "kind": "Method", "type": "BtStatus",
                 "params": [{"name": "target", "type": "Enemy"}]},
                {"name": "Attack", "kind": "Method", "type": "BtStatus",
                 "params": [{"name": "position", "type": "Vec2"}]},
                {"name": "DistanceTo", "kind": "Method", "type": "Float",
                 "params": [{"name": "other", "type": "Enemy"}]}
            ]
        },
        {
            "name": "Actor",
            "members": [
                {"name": "IsAlive", "kind": "Property", "type": "Bool"}
            ]
        },
        {
            "name": "Enemy",
            "bases": ["Actor"],
            "members": [
                {"name": "Distance", "kind": "Property", "type": "Float"},
                {"name": "Position", "kind": "Property", "type": "Vec2"}
            ]
        },
        {
            "name": "Vec2",
            "members": [
                {"name": "X", "kind": "Field", "type": "Float"},
                {"name": "Y", "kind": "Field", "type": "Float"}
            ]
        },
        {
            "name": "Board",
            "members": [
                {"name": "Ready", "kind": "Property", "type": "Bool"},
                {"name": "Waypoint", "kind": "Property", "type": "Vec2"}
            ]
        },
        {
            "name": "Inventory",
            "type_params": [{"name": "T", "constraint": "Actor"}],
            "members": [
                {"name": "Count", "kind": "Property", "type": "Int"},
                {"name": "First", "kind": "Property", "type": "T", "nullable": "Annotated"}
            ]
        },
        {
            "name": "Stance",
            "kind": "enum",
            "values": ["Aggressive", "Defensive"]
        }
    ]
}"#;

pub fn agent_schema() -> DynamicSchema {
    DynamicSchema::from_json(AGENT_SCHEMA_JSON).expect("fixture schema is valid")
}

/// parse → lower → expand → resolve → check, accumulating every diagnostic.
pub fn analyze_source(source: &str) -> (Program, SemanticModel, Diagnostics) {
    analyze_with_schema(source, &agent_schema())
}

pub fn analyze_with_schema(
    source: &str,
    schema: &DynamicSchema,
) -> (Program, SemanticModel, Diagnostics) {
    let parsed = parse(source).expect("within limits");
    let mut diagnostics = parsed.diagnostics.clone();
    let mut program = ast::lower(&parsed, &mut diagnostics);
    ast::expand(&mut program, &[], &mut diagnostics);
    let model = analyze::resolve(&program, schema, &mut diagnostics);
    analyze::check(&program, &model, schema, &mut diagnostics);
    (program, model, diagnostics)
}
