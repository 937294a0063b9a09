use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::MutexGuard;

use super::{CLAIMING, DeclEntry, NamedDeclarations, Shared, UnrecognizedBlock};
use crate::folder_parser::ParseResult;
use crate::ledger::DeclarationFile;
use crate::{DeclType, Declaration, DeclarationBlockSyntax, DeclarationCreator};

/// A declaration ready to enter the map.
struct StagedDecl {
	decl_type: DeclType,
	decl: Arc<dyn Declaration>,
	block: DeclarationBlockSyntax,
	source: DeclarationFile,
	stamp: u64,
	/// Created during staging, block syntax already set.
	fresh: bool,
}

#[derive(Debug, Default)]
struct MergeStats {
	created: usize,
	updated: usize,
	removed: usize,
	/// Instances created during staging that lost to one already in the map.
	discarded: usize,
}

impl Shared {
	/// Applies one folder job. Runs on the merge thread only.
	pub(super) fn on_parser_finished(&self, result: ParseResult) {
		if !self.is_current(result.slot, result.generation) {
			tracing::debug!(decl_type = %result.folder.default_type, folder = %result.folder.folder, generation = result.generation, "decl.merge.superseded");
			return;
		}

		let start = Instant::now();
		let ParseResult {
			slot,
			folder,
			generation,
			blocks,
			parsed_files,
			kept_files,
			..
		} = result;
		let default_type = folder.default_type;

		let creators = self.creators.read().clone();
		let mut staged = Vec::new();
		let mut unresolved = Vec::new();
		for (bucket, blocks) in blocks {
			for block in blocks {
				let source = DeclarationFile::new(default_type, block.file_name.clone());
				match creators.resolve(bucket, &block) {
					Some(creator) => staged.push(self.stage(creator.as_ref(), block, source, generation)),
					None => unresolved.push(UnrecognizedBlock {
						block,
						bucket,
						source,
						stamp: generation,
					}),
				}
			}
		}
		drop(creators);

		let merge = self.merge.lock();
		if !self.is_current(slot, generation) {
			tracing::debug!(decl_type = %default_type, folder = %folder.folder, generation, "decl.merge.superseded");
			return;
		}

		let gone: HashSet<DeclarationFile> = {
			let mut ledger = self.ledger.lock();
			let files = parsed_files.iter().map(|(file, stamp)| (file.clone(), *stamp)).chain(kept_files);
			let removed = ledger.replace_folder(default_type, &folder.folder, files);
			removed.into_iter().filter(|file| !ledger.contains(file)).collect()
		};
		let reparsed: HashSet<DeclarationFile> = parsed_files.into_keys().map(|file| DeclarationFile::new(default_type, file)).collect();

		let buffered = unresolved.len();
		{
			let mut buffer = self.unrecognized.lock();
			buffer.retain(|entry| !reparsed.contains(&entry.source) && !gone.contains(&entry.source));
			buffer.extend(unresolved);
		}
		staged.extend(self.stage_unrecognized(&merge));

		let mut stats = MergeStats::default();
		{
			let mut declarations = self.declarations.write();
			apply_staged(&mut declarations, staged, &mut stats);

			for decls in declarations.values_mut() {
				decls.retain(|name, entry| {
					let stale = gone.contains(&entry.source) || (reparsed.contains(&entry.source) && entry.stamp != generation);
					if stale {
						tracing::trace!(name = %name, file = %entry.source.file_name, "decl.merge.removed");
						stats.removed += 1;
					}
					!stale
				});
			}
		}
		drop(merge);

		tracing::debug!(
			decl_type = %default_type,
			folder = %folder.folder,
			generation,
			created = stats.created,
			updated = stats.updated,
			removed = stats.removed,
			discarded = stats.discarded,
			buffered,
			elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
			"decl.merge.complete"
		);
		self.emit_reloaded(default_type, generation);
	}

	/// Turns buffered blocks whose type keyword is now registered into
	/// declarations.
	pub(super) fn claim_unrecognized(&self, merge: &MutexGuard<'_, ()>) -> usize {
		let staged = self.stage_unrecognized(merge);
		if staged.is_empty() {
			return 0;
		}

		let mut stats = MergeStats::default();
		apply_staged(&mut self.declarations.write(), staged, &mut stats);
		tracing::debug!(created = stats.created, updated = stats.updated, "decl.unrecognized.claimed");
		stats.created + stats.updated
	}

	/// Removes resolvable blocks from the buffer and stages them. The merge
	/// lock must be held so the buffer and the creators agree. Blocks whose
	/// creator panics go back into the buffer.
	fn stage_unrecognized(&self, _merge: &MutexGuard<'_, ()>) -> Vec<StagedDecl> {
		let creators = self.creators.read().clone();
		let claimed: Vec<_> = {
			let mut buffer = self.unrecognized.lock();
			let (claimed, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut *buffer)
				.into_iter()
				.map(|entry| (creators.resolve(entry.bucket, &entry.block), entry))
				.partition(|(creator, _)| creator.is_some());
			*buffer = rest.into_iter().map(|(_, entry)| entry).collect();
			claimed
		};
		if claimed.is_empty() {
			return Vec::new();
		}

		let _claiming = ClaimScope::enter();
		let mut staged = Vec::with_capacity(claimed.len());
		let mut failed = Vec::new();
		for (creator, entry) in claimed {
			let Some(creator) = creator else {
				failed.push(entry);
				continue;
			};
			let attempt = panic::catch_unwind(AssertUnwindSafe(|| self.stage(creator.as_ref(), entry.block.clone(), entry.source.clone(), entry.stamp)));
			match attempt {
				Ok(decl) => staged.push(decl),
				Err(_) => {
					tracing::error!(name = %entry.block.name, file = %entry.source.file_name, "decl.unrecognized.creator_panicked");
					failed.push(entry);
				}
			}
		}

		if !failed.is_empty() {
			self.unrecognized.lock().extend(failed);
		}
		staged
	}

	/// Finds the declaration for `block`, or creates and fills a new one. The
	/// declaration lock is only held for the lookup, never across the creator.
	fn stage(&self, creator: &dyn DeclarationCreator, block: DeclarationBlockSyntax, source: DeclarationFile, stamp: u64) -> StagedDecl {
		let decl_type = creator.decl_type();
		let existing = self.declarations.read().get(&decl_type).and_then(|decls| decls.get(&block.name)).map(|entry| Arc::clone(&entry.decl));
		let fresh = existing.is_none();
		let decl = existing.unwrap_or_else(|| {
			let decl = creator.create_declaration(&block.name);
			decl.set_block_syntax(block.clone());
			decl
		});

		StagedDecl {
			decl_type,
			decl,
			block,
			source,
			stamp,
			fresh,
		}
	}
}

/// Marks the current thread as claiming buffered blocks until dropped.
struct ClaimScope {
	previous: bool,
}

impl ClaimScope {
	fn enter() -> Self {
		Self {
			previous: CLAIMING.with(|flag| flag.replace(true)),
		}
	}
}

impl Drop for ClaimScope {
	fn drop(&mut self) {
		CLAIMING.with(|flag| flag.set(self.previous));
	}
}

fn apply_staged(declarations: &mut HashMap<DeclType, NamedDeclarations>, staged: Vec<StagedDecl>, stats: &mut MergeStats) {
	for StagedDecl {
		decl_type,
		decl,
		block,
		source,
		stamp,
		fresh,
	} in staged
	{
		let decls = declarations.entry(decl_type).or_default();
		match decls.get_mut(&block.name) {
			// The instance already in the map wins, even if staging created another.
			Some(entry) => {
				entry.decl.set_block_syntax(block);
				entry.source = source;
				entry.stamp = stamp;
				stats.updated += 1;
				if fresh {
					stats.discarded += 1;
				}
			}
			None => {
				if !fresh {
					decl.set_block_syntax(block.clone());
				}
				decls.insert(block.name, DeclEntry { decl, source, stamp });
				stats.created += 1;
			}
		}
	}
}
