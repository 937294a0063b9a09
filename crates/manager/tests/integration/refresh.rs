use std::sync::Arc;

use decl_manager::{DeclType, DeclarationManager};
use decl_vfs::{MemoryFileSystem, VfsError, VfsFile, VirtualFileSystem};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use crate::common::{TESTDECL, TestDeclarationCreator, manager_for};

/// Records every file read.
#[derive(Default)]
struct CountingFileSystem {
	inner: MemoryFileSystem,
	reads: Mutex<Vec<String>>,
}

impl CountingFileSystem {
	fn take_reads(&self) -> Vec<String> {
		let mut reads = std::mem::take(&mut *self.reads.lock());
		reads.sort();
		reads
	}
}

impl VirtualFileSystem for CountingFileSystem {
	fn list_files(&self, folder: &str, extension: &str, max_depth: usize) -> Vec<VfsFile> {
		self.inner.list_files(folder, extension, max_depth)
	}

	fn read_text(&self, path: &str) -> Result<String, VfsError> {
		self.reads.lock().push(path.to_owned());
		self.inner.read_text(path)
	}
}

fn setup() -> (Arc<CountingFileSystem>, DeclarationManager) {
	let vfs = Arc::new(CountingFileSystem::default());
	vfs.inner.write("decls/a.decl", "decl/a { 1 }\n");
	vfs.inner.write("decls/b.decl", "decl/b { 1 }\nunknown decl/u { }\n");
	let manager = manager_for(Arc::clone(&vfs) as Arc<dyn VirtualFileSystem>);
	manager.register_decl_type(TESTDECL, TestDeclarationCreator::new(DeclType::Material)).expect("register");
	manager.register_decl_folder(DeclType::Material, "decls", "decl");
	manager.wait_until_idle();
	(vfs, manager)
}

#[test]
fn refresh_reads_only_changed_files() {
	let (vfs, manager) = setup();
	assert_eq!(vfs.take_reads(), vec!["decls/a.decl", "decls/b.decl"]);
	assert_eq!(manager.unrecognized_block_count(), 1);
	let b = manager.find_declaration(DeclType::Material, "decl/b").expect("decl/b");

	vfs.inner.write("decls/a.decl", "decl/a { 2 }\ndecl/a2 { }\n");
	manager.refresh_declarations();
	manager.wait_until_idle();

	assert_eq!(vfs.take_reads(), vec!["decls/a.decl"]);
	assert_eq!(manager.declaration_names(DeclType::Material), vec!["decl/a", "decl/a2", "decl/b"]);
	assert_eq!(manager.find_declaration(DeclType::Material, "decl/a").expect("decl/a").block_syntax().contents, " 2 ");
	assert!(Arc::ptr_eq(&b, &manager.find_declaration(DeclType::Material, "decl/b").expect("decl/b")));
	assert_eq!(manager.unrecognized_block_count(), 1);
}

#[test]
fn refresh_purges_removed_files() {
	let (vfs, manager) = setup();
	vfs.take_reads();

	assert!(vfs.inner.remove("decls/b.decl"));
	manager.refresh_declarations();
	manager.wait_until_idle();

	assert!(vfs.take_reads().is_empty());
	assert_eq!(manager.declaration_names(DeclType::Material), vec!["decl/a"]);
	assert_eq!(manager.unrecognized_block_count(), 0);
	assert_eq!(manager.parsed_file_count(), 1);
}

#[test]
fn full_reload_ignores_stamps() {
	let (vfs, manager) = setup();
	vfs.take_reads();

	manager.reload_declarations();
	manager.wait_until_idle();

	assert_eq!(vfs.take_reads(), vec!["decls/a.decl", "decls/b.decl"]);
	assert_eq!(manager.declaration_names(DeclType::Material), vec!["decl/a", "decl/b"]);
	assert_eq!(manager.unrecognized_block_count(), 1);
}
