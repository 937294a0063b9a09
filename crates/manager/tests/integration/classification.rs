use std::collections::HashSet;
use std::sync::Arc;

use decl_manager::{DeclManagerOptions, DeclType, DeclarationManager, RegisteredFolder};
use decl_vfs::{DiskFileSystem, MemoryFileSystem};
use pretty_assertions::assert_eq;

use crate::common::{Fixture, TESTDECL, TESTDECL2, TestDeclarationCreator, manager_for, material_names, table_names};

#[test]
fn folder_and_extension_spellings_are_equivalent() {
	for (folder, extension) in [("testdecls/", "decl"), ("testdecls", "decl"), ("testdecls", ".decl"), ("testdecls\\", ".DECL")] {
		let fixture = Fixture::new();
		fixture.register_test_types();
		fixture.manager.register_decl_folder(DeclType::Material, folder, extension);

		assert_eq!(fixture.manager.declaration_names(DeclType::Material), material_names(), "folder {folder:?} extension {extension:?}");
		assert_eq!(fixture.manager.registered_folders(), vec![RegisteredFolder::new(DeclType::Material, "testdecls/", "decl")]);
	}
}

#[test]
fn type_keywords_split_blocks_between_creators() {
	let fixture = Fixture::new();
	fixture.register_test_types();
	fixture.manager.register_decl_folder(DeclType::Material, "testdecls", "decl");

	let materials = fixture.manager.declaration_names(DeclType::Material);
	let tables = fixture.manager.declaration_names(DeclType::ModelDef);
	assert_eq!(materials, material_names());
	assert_eq!(tables, table_names());

	let materials: HashSet<_> = materials.into_iter().collect();
	assert!(tables.iter().all(|name| !materials.contains(name)));

	let mut visited = Vec::new();
	fixture.manager.foreach_declaration(DeclType::ModelDef, |decl| {
		assert_eq!(decl.decl_type(), DeclType::ModelDef);
		assert_eq!(decl.block_syntax().type_name, TESTDECL2);
		visited.push(decl.decl_name().to_owned());
	});
	visited.sort();
	assert_eq!(visited, table_names());
}

#[test]
fn late_registration_claims_buffered_blocks() {
	let fixture = Fixture::new();
	let manager = &fixture.manager;
	manager.register_decl_type(TESTDECL, TestDeclarationCreator::new(DeclType::Material)).expect("register");
	manager.register_decl_folder(DeclType::Material, "testdecls", "decl");

	assert_eq!(manager.declaration_names(DeclType::Material), material_names());
	assert_eq!(manager.declaration_count(DeclType::ModelDef), 0);
	assert_eq!(manager.unrecognized_block_count(), 3);

	manager.register_decl_type(TESTDECL2, TestDeclarationCreator::new(DeclType::ModelDef)).expect("register");
	assert_eq!(manager.declaration_names(DeclType::ModelDef), table_names());
	assert_eq!(manager.unrecognized_block_count(), 0);

	let table = manager.find_declaration(DeclType::ModelDef, "decltable1").expect("decltable1");
	assert_eq!(table.block_syntax().contents, " { 0, 0, 0, 0, 1, 1 } ");
	assert_eq!(table.block_syntax().file_name, "testdecls/decltables.decl");
}

#[test]
fn folders_accumulate_under_one_default_type() {
	let fixture = Fixture::new();
	fixture.register_test_types();
	fixture.manager.register_decl_folder(DeclType::Material, "testdecls", "decl");
	fixture.manager.register_decl_folder(DeclType::Material, "testmodels", "def");

	let mut expected = material_names();
	expected.push("models/box".to_owned());
	expected.sort();
	assert_eq!(fixture.manager.declaration_names(DeclType::Material), expected);
	assert_eq!(fixture.manager.registered_folders().len(), 2);
	assert_eq!(fixture.manager.parsed_file_count(), 6);
}

#[test]
fn names_are_unique_per_type_only() {
	let vfs = Arc::new(MemoryFileSystem::new());
	vfs.write("decls/a.decl", "decl/shared { first }\ntestdecl2 decl/shared { table }\n");
	vfs.write("decls/b.decl", "decl/shared { second }\n{ unnamed }\n");
	let manager = manager_for(vfs);
	manager.register_decl_type(TESTDECL, TestDeclarationCreator::new(DeclType::Material)).expect("register");
	manager.register_decl_type(TESTDECL2, TestDeclarationCreator::new(DeclType::ModelDef)).expect("register");
	manager.register_decl_folder(DeclType::Material, "decls", "decl");

	let shared = manager.find_declaration(DeclType::Material, "decl/shared").expect("material");
	assert_eq!(shared.block_syntax().contents, " second ");
	assert_eq!(shared.block_syntax().file_name, "decls/b.decl");

	let table = manager.find_declaration(DeclType::ModelDef, "decl/shared").expect("table");
	assert_eq!(table.block_syntax().contents, " table ");
	assert_eq!(manager.declaration_count(DeclType::Material), 1);
}

#[test]
fn depth_limit_is_honoured() {
	let fixture = Fixture::new();
	fixture.register_test_types();
	crate::common::write_file(fixture.root(), "testdecls/a/b/c/deepest.decl", "decl/deepest { }\n");

	fixture.manager.register_decl_folder(DeclType::Material, "testdecls", "decl");
	assert!(fixture.manager.find_declaration(DeclType::Material, "decl/deepest").is_some());

	let options = DeclManagerOptions {
		max_depth: 1,
		worker_threads: 1,
		..Default::default()
	};
	let manager = DeclarationManager::new(Arc::new(DiskFileSystem::new(fixture.root())), options).expect("manager");
	manager.register_decl_type(TESTDECL, TestDeclarationCreator::new(DeclType::Material)).expect("register");
	manager.register_decl_folder(DeclType::Material, "testdecls", "decl");
	assert!(manager.find_declaration(DeclType::Material, "decl/numbers/0").is_some());
	assert!(manager.find_declaration(DeclType::Material, "decl/nested/1").is_none());
	assert!(manager.find_declaration(DeclType::Material, "decl/deepest").is_none());
}
