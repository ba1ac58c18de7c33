//! Against the real shell. Needs an interactive Windows session.
#![cfg(windows)]

use dock_icons::{EngineConfig, IconEngine, IconErrorKind, IconSize};

#[test]
fn notepad_has_an_icon() {
    let engine = IconEngine::new(EngineConfig::default());
    assert!(engine.dependency_error().is_none());

    let icon = engine.extract_icon(r"C:\Windows\System32\notepad.exe", IconSize::MEDIUM, 0);
    assert!(icon.success(), "{:?}", icon.error());
    assert_eq!(icon.image().unwrap().dimensions(), (32, 32));
    assert!(icon.info().bits_per_pixel > 0);
}

#[test]
fn missing_executable_is_source_not_found() {
    let engine = IconEngine::new(EngineConfig::default());
    let icon = engine.extract_icon(r"C:\definitely\not\here.exe", 32, 0);
    assert_eq!(icon.error_kind(), Some(IconErrorKind::SourceNotFound));
}

#[test]
fn text_files_resolve_through_the_registry() {
    let engine = IconEngine::new(EngineConfig::default());
    assert!(engine.extract_extension_icon(".txt", 32).success());
}

#[test]
fn tray_discovery_never_panics() {
    let engine = IconEngine::new(EngineConfig::default());
    for record in engine.get_tray_icons(16) {
        assert!(record.icon.success());
        assert_eq!(record.icon.image().unwrap().width(), 16);
    }
}

#[test]
fn large_system_ids_fail_softly() {
    let engine = IconEngine::new(EngineConfig::default());
    let icon = engine.extract_icon("70000", 32, 0);
    assert!(!icon.success());
    assert!(engine.extract_system_icon(70000, 32).error().is_some());
}
