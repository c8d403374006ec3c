use cartograph_parser::{EdgeOp, error::ErrorCode, parse};

const GENERATED: &str = r##"# Generated by cartograph
# diagram: class, layout: hierarchical, theme: professional_blue

direction: down
vars: {
  d2-config: {
    layout-engine: dagre
  }
}

classes: {
  role_entity: {
    shape: class
    style: {
      fill: "#e3f2fd"
      stroke: "#1565c0"
      stroke-width: 2
      border-radius: 4
    }
  }
  role_service: {
    shape: hexagon
    style.fill: "#e8f5e9"
  }
}

grp_1: "" {
  base_entity: "BaseEntity\n+ id()" {
    class: role_entity
  }
  user: "User\n+ login()\n- email" {
    class: role_entity
  }
}
grp_2: "" {
  audit_service: "AuditService" {
    class: role_service
  }
}

grp_1.user -> grp_1.base_entity: {
  style: {
    stroke: "#2196f3"
    stroke-width: 2
  }
  target-arrowhead: {
    shape: triangle
  }
}
grp_2.audit_service -- grp_1.user: {
  style: {
    stroke: "#9e9e9e"
    stroke-dash: 5
  }
}
"##;

#[test]
fn test_generated_document() {
    let document = parse(GENERATED).expect("generated text should parse");

    assert_eq!(document.direction(), Some("down"));
    assert_eq!(document.layout_engine(), Some("dagre"));
    assert!(document.warnings().is_empty());

    let containers: Vec<&str> = document.containers().map(|s| s.path()).collect();
    assert_eq!(containers, vec!["grp_1", "grp_2"]);

    let titles: Vec<&str> = document.leaf_shapes().map(|s| s.title()).collect();
    assert_eq!(titles, vec!["BaseEntity", "User", "AuditService"]);

    let user = document.shape("grp_1.user").expect("user should exist");
    assert_eq!(user.display_label(), "User\n+ login()\n- email");
    assert_eq!(user.classes(), ["role_entity"]);

    let entity = &document.classes()["role_entity"];
    assert_eq!(entity.shape(), Some("class"));
    assert_eq!(entity.style().len(), 4);

    let connections = document.connections();
    assert_eq!(connections.len(), 2);
    assert_eq!(connections[0].operator(), EdgeOp::Forward);
    assert_eq!(
        connections[0].target_arrowhead().and_then(|a| a.shape()),
        Some("triangle")
    );
    assert_eq!(connections[1].operator(), EdgeOp::Undirected);
    assert_eq!(
        connections[1].style().get("stroke-dash").map(String::as_str),
        Some("5")
    );
}

#[test]
fn test_semicolons_and_inline_blocks() {
    let document = parse("a: Alpha { shape: oval }; b; a -> b").expect("should parse");
    assert_eq!(document.shape("a").and_then(|s| s.shape()), Some("oval"));
    assert_eq!(document.shape("a").map(|s| s.title()), Some("Alpha"));
    assert_eq!(document.connections().len(), 1);
}

#[test]
fn test_case_insensitive_keys() {
    let document = parse("Svc: Service\nsvc.shape: cylinder").expect("should parse");
    assert_eq!(document.shapes().count(), 1);
    let svc = document.shape("SVC").expect("shape should exist");
    assert_eq!(svc.key(), "Svc");
    assert_eq!(svc.shape(), Some("cylinder"));
}

#[test]
fn test_empty_document() {
    let document = parse("# nothing here\n\n").expect("should parse");
    assert_eq!(document.shapes().count(), 0);
    assert!(document.connections().is_empty());
}

#[test]
fn test_errors_across_phases() {
    let lexical = parse("a: \"open").unwrap_err();
    assert_eq!(lexical.diagnostics()[0].code(), Some(ErrorCode::E001));

    let syntactic = parse("a: {\n  b\n").unwrap_err();
    assert_eq!(syntactic.diagnostics()[0].code(), Some(ErrorCode::E101));

    let semantic = parse("a.shape: blob").unwrap_err();
    assert_eq!(semantic.diagnostics()[0].code(), Some(ErrorCode::E302));
    assert!(semantic.to_string().contains("E302"));
}

#[test]
fn test_undefined_class_warns() {
    let document = parse("a.class: missing").expect("warnings do not fail");
    assert_eq!(document.warnings().len(), 1);
    assert_eq!(document.warnings()[0].code(), Some(ErrorCode::E305));
}
