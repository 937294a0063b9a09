use decl_manager::DeclType;
use pretty_assertions::assert_eq;

use crate::common::Fixture;

#[test]
fn shutdown_waits_for_jobs_and_clears_state() {
	let fixture = Fixture::new();
	let manager = &fixture.manager;
	fixture.register_test_types();
	let mut reloaded = manager.signal_decls_reloaded(DeclType::Material);
	manager.register_decl_folder(DeclType::Material, "testdecls", "decl");
	manager.register_decl_folder(DeclType::ModelDef, "testmodels", "def");

	manager.shutdown();

	assert!(manager.declaration_names(DeclType::Material).is_empty());
	assert_eq!(manager.declaration_count(DeclType::ModelDef), 0);
	assert_eq!(manager.parsed_file_count(), 0);
	assert_eq!(manager.unrecognized_block_count(), 0);
	assert!(manager.registered_folders().is_empty());

	// The sender is gone once any event sent before shutdown is drained.
	while reloaded.try_recv().is_ok() {}
	assert!(matches!(reloaded.try_recv(), Err(tokio::sync::broadcast::error::TryRecvError::Closed)));
}

#[test]
fn manager_is_inert_after_shutdown() {
	let fixture = Fixture::new();
	let manager = &fixture.manager;
	manager.shutdown();
	manager.shutdown();

	fixture.register_test_types();
	manager.register_decl_folder(DeclType::Material, "testdecls", "decl");
	manager.reload_declarations();
	manager.wait_until_idle();

	assert!(manager.find_declaration(DeclType::Material, "decl/numbers/0").is_none());
	assert!(manager.registered_folders().is_empty());
}
