use glam::Vec3;
use rollway_core::{CellMarker, GenerationMode, InstanceId, Position, PrototypeId, RunId};
use rollway_level::{
    DecorationPlacement, Grid, InteractivePair, Level, PathSet, PlacementResult, PlatformGraph,
    SteamEmitterPlacement, TerrainLayout,
};
use rollway_rendering::{Glyph, GlyphMap, Presentation, RenderingBackend, TextBackend};

fn level() -> Level {
    let mut grid = Grid::open(7);
    let _ = grid.set(Position::new(3, 1), CellMarker::Wall);
    let _ = grid.set(Position::new(4, 4), CellMarker::Collectible);
    let _ = grid.set(Position::new(5, 5), CellMarker::Goal);
    let walkable_tiles = grid.walkable_positions();

    Level {
        run: RunId::new(3),
        seed: 42,
        terrain: TerrainLayout {
            mode: GenerationMode::Platforms,
            walkable_percent: grid.walkable_percent(),
            grid,
            main_path: PathSet::default(),
            platform_graph: PlatformGraph::default(),
            walkable_tiles,
            below_minimum_walkable: false,
            spawn: Position::new(1, 1),
            moving_platform_tiles: vec![Position::new(2, 3)],
            rotating_obstacle_sites: vec![Position::new(3, 3)],
        },
        placements: PlacementResult {
            collectibles: vec![Position::new(4, 4)],
            goal: Some(Position::new(5, 5)),
            spawn: Position::new(1, 1),
            dead_ends: Vec::new(),
        },
        objects: Vec::new(),
        decorations: vec![DecorationPlacement {
            cell: Position::new(5, 1),
            prototype: PrototypeId::new(9),
        }],
        steam_emitters: vec![SteamEmitterPlacement {
            center: Position::new(1, 5),
            prototype: PrototypeId::new(8),
            position: Vec3::new(2.0, 2.0, 10.0),
        }],
        interactive_pairs: vec![InteractivePair {
            switch: Position::new(1, 3),
            gate: Position::new(5, 3),
            switch_instance: InstanceId::new(1),
            gate_instance: InstanceId::new(2),
        }],
        warnings: Vec::new(),
    }
}

#[test]
fn composed_map_layers_every_overlay() {
    let map = GlyphMap::compose(&level());
    let expected = GlyphMap::parse(
        "#######\n\
         #S.#.d#\n\
         #.....#\n\
         #s=R.g#\n\
         #...*.#\n\
         #~...G#\n\
         #######\n",
    )
    .expect("expected map parses");
    assert_eq!(map, expected);
}

#[test]
fn goal_wins_over_spawn_on_shared_cell() {
    let mut level = level();
    level.placements.goal = Some(level.placements.spawn);
    let map = GlyphMap::compose(&level);
    assert_eq!(map.get(Position::new(1, 1)), Some(Glyph::Goal));
    assert_eq!(map.count(Glyph::Spawn), 0);
}

#[test]
fn text_backend_writes_title_map_and_legend() {
    let presentation = Presentation::of_level(&level());
    let mut backend = TextBackend::new(Vec::new());
    backend.present(&presentation).expect("writing to memory succeeds");
    let output = String::from_utf8(backend.into_inner()).expect("output is utf-8");

    let mut lines = output.lines();
    let title = lines.next().expect("title line");
    assert!(title.contains("seed 42"));
    assert!(title.contains("Platforms"));
    assert!(output.contains("#S.#.d#"));
    assert!(output.contains("~ steam emitter"));
    assert!(output.contains("g gate"));
    assert!(output.contains("objects: 0 total"));
}

#[test]
fn legend_can_be_suppressed() {
    let presentation = Presentation::of_level(&level()).without_legend();
    let mut backend = TextBackend::new(Vec::new());
    backend.present(&presentation).expect("writing to memory succeeds");
    let output = String::from_utf8(backend.into_inner()).expect("output is utf-8");
    assert!(!output.contains("# wall"));
}
