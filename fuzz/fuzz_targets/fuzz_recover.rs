#![no_main]

use gm_core::GraphmendError;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    match gm_parser::recover(input) {
        Ok(recovery) => {
            assert!(!recovery.graph.is_empty());
            assert!(recovery.graph.dangling_endpoints().is_empty());
            let markup = gm_render::render_mermaid(&recovery.graph);
            assert_eq!(
                markup.lines().count(),
                1 + recovery.graph.node_count() + recovery.graph.edge_count()
            );
        }
        Err(error) => assert!(matches!(error, GraphmendError::NoNodesRecovered { .. })),
    }
});
