use approx::assert_relative_eq;
use bianzheng_core::{BianzhengError, Composition, EdgePolicy, PatternCatalog, SyndromePattern};
use bianzheng_graph::{
    layout, ChainGroup, ChainGroups, ChainIndex, EvolutionGraph, GraphBuilder, Position, Relation,
    Severity, ALL_CHAINS,
};
use std::collections::HashMap;

const GRAPH: &str = r#"{
  "version": "1.0",
  "nodes": [
    {"id": "piqixu", "name": "脾氣虛證", "category": "臟腑證候", "severity": 1, "is_critical": false},
    {"id": "zhongqixiaxian", "name": "中氣下陷證", "category": "臟腑證候", "severity": 2, "is_critical": false},
    {"id": "qituo", "name": "氣脫證", "category": "危重證候", "severity": 3, "is_critical": true},
    {"id": "a", "name": "甲證", "category": "基礎證候", "severity": 1, "is_critical": false},
    {"id": "b", "name": "乙證", "category": "基礎證候", "severity": 2, "is_critical": true},
    {"id": "xueyu", "name": "血瘀證", "category": "基礎證候", "severity": 2, "is_critical": false}
  ],
  "edges": [
    {"from": "piqixu", "to": "zhongqixiaxian", "relation": "發展", "description": "脾虛日久"},
    {"from": "zhongqixiaxian", "to": "qituo", "relation": "惡化", "description": "氣陷不復"},
    {"from": "piqixu", "to": "qituo", "relation": "危變", "description": "暴脫"},
    {"from": "a", "to": "b", "relation": "development", "description": ""},
    {"from": "b", "to": "nowhere", "relation": "worsening", "description": ""}
  ],
  "evolution_chains": [
    {"id": "chain_pi_qi_xu", "name": "脾氣虛演變鏈", "path": ["piqixu", "zhongqixiaxian", "qituo"]},
    {"id": "c1", "name": "測試鏈", "path": ["a", "missing", "b"]},
    {"id": "chain_xue_yu", "name": "血瘀鏈", "path": ["xueyu", "gone"]}
  ],
  "statistics": {"total_nodes": 6, "total_edges": 5, "critical_nodes": 2, "evolution_chains": 3}
}"#;

fn load() -> EvolutionGraph {
    EvolutionGraph::from_json(GRAPH, EdgePolicy::Dedupe).unwrap()
}

#[test]
fn test_edge_is_visible_from_both_endpoints() {
    let graph = load();
    let out = graph.neighbors_out("piqixu");
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].to, "zhongqixiaxian");
    assert_eq!(out[0].relation, Relation::Development);
    assert_eq!(out[1].to, "qituo");

    let incoming = graph.neighbors_in("zhongqixiaxian");
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].from, "piqixu");
}

#[test]
fn test_chain_skips_missing_nodes() {
    let graph = load();
    let nodes = graph.nodes_in_chain("c1").unwrap();
    let ids: Vec<_> = nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);

    assert!(matches!(
        graph.nodes_in_chain("no_such_chain"),
        Err(BianzhengError::UnknownChain(_))
    ));
    assert_eq!(graph.chain_node_ids("chain_xue_yu").len(), 1);
}

#[test]
fn test_neighbor_lists_partition_edges() {
    let graph = load();
    let mut ids: Vec<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
    ids.push("nowhere");

    let out_total: usize = ids.iter().map(|id| graph.neighbors_out(id).len()).sum();
    let in_total: usize = ids.iter().map(|id| graph.neighbors_in(id).len()).sum();
    assert_eq!(out_total, graph.edges().len());
    assert_eq!(in_total, graph.edges().len());

    for edge in graph.edges() {
        assert_eq!(graph.neighbors_out(&edge.from).iter().filter(|e| ***e == *edge).count(), 1);
        assert_eq!(graph.neighbors_in(&edge.to).iter().filter(|e| ***e == *edge).count(), 1);
    }
}

#[test]
fn test_severity_tiers_cover_every_node_once() {
    let graph = load();
    let tiers = graph.compute_severity_tiers();

    let keys: Vec<u8> = tiers.keys().map(|s| s.value()).collect();
    assert_eq!(keys, vec![1, 2, 3]);

    let total: usize = tiers.values().map(Vec::len).sum();
    assert_eq!(total, graph.nodes().len());
    for node in graph.nodes() {
        assert!(tiers[&node.severity].iter().any(|n| n.id == node.id));
    }
    let moderate: Vec<_> = tiers[&Severity::MODERATE].iter().map(|n| n.id.as_str()).collect();
    assert_eq!(moderate, vec!["zhongqixiaxian", "b", "xueyu"]);
}

#[test]
fn test_filter_by_chain_category_induces_subgraph() {
    let graph = load();
    let groups = ChainGroups::default();

    let qi = graph.filter_by_chain_category(&groups, "qi");
    assert_eq!(qi.nodes.len(), 3);
    assert_eq!(qi.edges.len(), 3);

    let blood = graph.filter_by_chain_category(&groups, "blood");
    assert_eq!(blood.nodes.len(), 1);
    assert!(blood.edges.is_empty());

    let all = graph.filter_by_chain_category(&groups, ALL_CHAINS);
    assert_eq!(all.nodes.len(), graph.nodes().len());

    // Group whose chains are all absent from the graph.
    let weiqi = graph.filter_by_chain_category(&groups, "weiqi");
    assert_eq!(weiqi.edges.len(), graph.edges().len());

    let custom = ChainGroups::new(vec![ChainGroup {
        key: "test".to_string(),
        chain_ids: vec!["c1".to_string()],
    }]);
    let test = graph.filter_by_chain_category(&custom, "test");
    assert_eq!(test.nodes.len(), 2);
    assert_eq!(test.edges.len(), 1);
}

#[test]
fn test_group_with_only_missing_path_ids_filters_to_empty() {
    let graph = EvolutionGraph::from_json(
        r#"{
          "nodes": [
            {"id": "a", "name": "甲證", "category": "基礎證候", "severity": 1},
            {"id": "b", "name": "乙證", "category": "基礎證候", "severity": 2}
          ],
          "edges": [{"from": "a", "to": "b", "relation": "發展"}],
          "evolution_chains": [{"id": "dangling", "name": "虛鏈", "path": ["ghost1", "ghost2"]}],
          "statistics": {}
        }"#,
        EdgePolicy::Dedupe,
    )
    .unwrap();
    let groups = ChainGroups::new(vec![
        ChainGroup {
            key: "g".to_string(),
            chain_ids: vec!["dangling".to_string()],
        },
        ChainGroup {
            key: "absent".to_string(),
            chain_ids: vec!["no_such_chain".to_string()],
        },
    ]);

    let view = graph.filter_by_chain_category(&groups, "g");
    assert!(view.nodes.is_empty());
    assert!(view.edges.is_empty());

    let absent = graph.filter_by_chain_category(&groups, "absent");
    assert_eq!(absent.nodes.len(), 2);
    assert_eq!(absent.edges.len(), 1);
}

#[test]
fn test_declared_branch_points_are_kept() {
    let graph = EvolutionGraph::from_json(
        r#"{
          "nodes": [], "edges": [], "evolution_chains": [], "statistics": {},
          "branch_points": [
            {"from": "a", "from_name": "甲證", "branches": [{"to": "b", "to_name": "乙證", "description": "日久"}]},
            {"branches": "broken"}
          ]
        }"#,
        EdgePolicy::Dedupe,
    )
    .unwrap();

    let declared = graph.declared_branch_points();
    assert_eq!(declared.len(), 1);
    assert_eq!(declared[0].branches[0].description, "日久");
}

#[test]
fn test_chain_index_groups() {
    let graph = load();
    let index = ChainIndex::new(&graph, ChainGroups::default());

    let qi: Vec<_> = index.chains_by_group("qi").iter().map(|c| c.id.as_str()).collect();
    assert_eq!(qi, vec!["chain_pi_qi_xu"]);
    assert!(index.chains_by_group("weiqi").is_empty());
    assert!(index.chains_by_group("unknown").is_empty());

    let ungrouped: Vec<_> = index.ungrouped().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ungrouped, vec!["c1"]);
}

#[test]
fn test_highlight_and_detail_queries() {
    let graph = load();

    let related = graph.related_ids("zhongqixiaxian");
    assert_eq!(related.len(), 3);
    assert!(related.contains("piqixu") && related.contains("qituo"));

    let summary = graph.evolution_summary("b").unwrap();
    assert_eq!(summary.evolves_to, vec!["nowhere"]);
    assert_eq!(summary.evolves_from, vec!["甲證"]);

    assert_eq!(graph.dangling_edges().len(), 1);
    let branches = graph.branch_points();
    assert_eq!(branches.len(), 1);
    assert_eq!(branches[0].from_name, "脾氣虛證");
    let descriptions: Vec<_> = branches[0].branches.iter().map(|b| b.description.as_str()).collect();
    assert_eq!(descriptions, vec!["脾虛日久", "暴脫"]);
    assert!(graph.declared_branch_points().is_empty());

    assert_eq!(graph.statistics(), &graph.computed_statistics());
}

#[test]
fn test_layouts_feed_position_cache() {
    let mut graph = load();
    let positions = {
        let tiers = graph.compute_severity_tiers();
        layout::radial(&tiers, Position::new(0.0, 0.0), 100.0)
    };
    graph.apply_positions(positions);

    let piqixu = graph.position("piqixu").unwrap();
    assert_relative_eq!(piqixu.x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(piqixu.y, -100.0, epsilon = 1e-9);

    let positions: HashMap<String, Position> = {
        let tiers = graph.compute_severity_tiers();
        layout::hierarchical(&tiers, 400.0, 400.0)
    };
    graph.apply_positions(positions);
    assert_relative_eq!(graph.position("qituo").unwrap().y, 300.0);
}

#[test]
fn test_built_document_loads_back() {
    let pattern = |id: &str, name: &str, nature: &str| {
        SyndromePattern::new(
            id,
            name,
            Composition {
                location: vec![],
                nature: vec![nature.to_string()],
            },
        )
    };
    let catalog = PatternCatalog::new(vec![
        pattern("qi_xu_zheng", "氣虛證", "qi_xu").with_evolution(vec![], vec!["qi_tuo_zheng".into()]),
        pattern("qi_tuo_zheng", "氣脫證", "qi_tuo"),
    ]);

    let json = GraphBuilder::new(&catalog).build().to_json_pretty().unwrap();
    let graph = EvolutionGraph::from_json(&json, EdgePolicy::Reject).unwrap();

    assert_eq!(graph.nodes().len(), 2);
    assert_eq!(graph.neighbors_in("qi_tuo_zheng").len(), 1);
    assert!(graph.chain("chain_qi_xu_zheng").is_some());
    assert!(graph.chain("qi_disease_chain").is_some());
    assert_eq!(graph.statistics(), &graph.computed_statistics());
}
