//! Memoized per-file compilation pipeline.
//!
//! `QueryStore` owns the sources of a compilation session and derives
//! tokens → CST → AST → semantic model → IR lazily, caching each stage per
//! file. `set_source_text` replaces the whole entry, `set_context_type`
//! drops the semantic stages of every file; a cached value is never
//! half-updated - either a stage completes and is stored, or the previous
//! value remains.
//!
//! Every stage is a pure function of `(source_text, schema)`. Phase panics
//! are contract violations; they surface as `internal-error` diagnostics
//! for the file instead of poisoning the session.

use std::cell::OnceCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use indexmap::IndexMap;
use rowan::TextRange;

use crisp_core::{DynamicSchema, FileId};
use crisp_ir::IrModule;

use crate::analyze::{self, SemanticModel};
use crate::ast::{self, Template};
use crate::compile;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::parser::{self, ParseResult, Token};

/// A lowered-and-expanded AST plus the diagnostics that stage produced.
#[derive(Debug)]
pub struct AstStage {
    pub program: ast::Program,
    pub diagnostics: Diagnostics,
}

/// Semantic model plus resolution/inference diagnostics.
#[derive(Debug)]
pub struct ResolveStage {
    pub model: SemanticModel,
    pub diagnostics: Diagnostics,
}

struct FileEntry {
    path: Option<String>,
    text: Rc<str>,
    tokens: OnceCell<Rc<Vec<Token>>>,
    parse: OnceCell<Rc<ParseResult>>,
    /// Lowered but unexpanded (so imports can pull templates without
    /// re-entering the expanded stage).
    lower: OnceCell<Rc<AstStage>>,
    ast: OnceCell<Rc<AstStage>>,
    resolve: OnceCell<Rc<ResolveStage>>,
    type_check: OnceCell<Rc<Diagnostics>>,
    ir: OnceCell<Rc<IrModule>>,
}

impl FileEntry {
    fn new(path: Option<String>, text: Rc<str>) -> FileEntry {
        FileEntry {
            path,
            text,
            tokens: OnceCell::new(),
            parse: OnceCell::new(),
            lower: OnceCell::new(),
            ast: OnceCell::new(),
            resolve: OnceCell::new(),
            type_check: OnceCell::new(),
            ir: OnceCell::new(),
        }
    }

    /// Carries the syntax stages over while dropping the semantic ones.
    fn invalidate_semantics(&mut self) {
        self.resolve = OnceCell::new();
        self.type_check = OnceCell::new();
        self.ir = OnceCell::new();
    }
}

/// The session-wide store: files in, memoized pipeline stages out.
#[derive(Default)]
pub struct QueryStore {
    files: IndexMap<FileId, FileEntry>,
    schema: Option<Rc<DynamicSchema>>,
    next_file: u32,
}

impl QueryStore {
    pub fn new() -> QueryStore {
        QueryStore::default()
    }

    /// Registers a source under an optional path (used by imports).
    pub fn add_file(&mut self, path: Option<&str>, text: &str) -> FileId {
        let id = FileId(self.next_file);
        self.next_file += 1;
        self.files
            .insert(id, FileEntry::new(path.map(str::to_string), text.into()));
        id
    }

    /// Replaces a file's text, dropping every derived value.
    pub fn set_source_text(&mut self, id: FileId, text: &str) {
        if let Some(entry) = self.files.get_mut(&id) {
            *entry = FileEntry::new(entry.path.take(), text.into());
        }
    }

    /// Installs the context-type descriptor; semantic stages of every file
    /// are recomputed on next query.
    pub fn set_context_type(&mut self, schema: DynamicSchema) {
        self.schema = Some(Rc::new(schema));
        for entry in self.files.values_mut() {
            entry.invalidate_semantics();
        }
    }

    pub fn remove_file(&mut self, id: FileId) {
        self.files.shift_remove(&id);
    }

    pub fn file_ids(&self) -> Vec<FileId> {
        self.files.keys().copied().collect()
    }

    pub fn source_text(&self, id: FileId) -> Option<Rc<str>> {
        self.files.get(&id).map(|e| e.text.clone())
    }

    pub fn path_of(&self, id: FileId) -> Option<&str> {
        self.files.get(&id)?.path.as_deref()
    }

    fn entry(&self, id: FileId) -> &FileEntry {
        self.files.get(&id).expect("unknown file id")
    }

    fn file_by_path(&self, path: &str) -> Option<FileId> {
        self.files
            .iter()
            .find(|(_, e)| e.path.as_deref() == Some(path))
            .map(|(id, _)| *id)
    }

    /// Token stream including the final `EndOfFile` token.
    pub fn tokens(&self, id: FileId) -> Rc<Vec<Token>> {
        let entry = self.entry(id);
        entry
            .tokens
            .get_or_init(|| Rc::new(parser::lex(&entry.text)))
            .clone()
    }

    /// Lossless CST, node ids, and parse diagnostics.
    pub fn parse(&self, id: FileId) -> Rc<ParseResult> {
        let entry = self.entry(id);
        entry
            .parse
            .get_or_init(|| {
                let tokens = parser::lex(&entry.text);
                let result = parser::Parser::new(&entry.text, tokens)
                    .with_exec_fuel(None)
                    .parse();
                match result {
                    Ok(parsed) => Rc::new(parsed),
                    // Resource-limit failure: report it and fall back to an
                    // empty program so the CST contract holds.
                    Err(err) => {
                        let mut fallback = parser::Parser::new("", Vec::new())
                            .parse()
                            .expect("empty parse cannot exhaust limits");
                        fallback
                            .diagnostics
                            .report(DiagnosticKind::InternalError, TextRange::empty(0.into()))
                            .message(format!("parsing aborted: {err}"))
                            .emit();
                        Rc::new(fallback)
                    }
                }
            })
            .clone()
    }

    /// Lowered, *unexpanded* AST. Import processing pulls template
    /// definitions from this stage so files never re-enter each other.
    fn lower(&self, id: FileId) -> Rc<AstStage> {
        let entry = self.entry(id);
        entry
            .lower
            .get_or_init(|| {
                let parsed = self.parse(id);
                let mut diagnostics = Diagnostics::new();
                let program = ast::lower(&parsed, &mut diagnostics);
                Rc::new(AstStage {
                    program,
                    diagnostics,
                })
            })
            .clone()
    }

    /// Expanded AST plus lowering/expansion diagnostics.
    pub fn ast(&self, id: FileId) -> Rc<AstStage> {
        let entry = self.entry(id);
        entry
            .ast
            .get_or_init(|| {
                let lowered = self.lower(id);
                let mut diagnostics = lowered.diagnostics.clone();
                let mut program = lowered.program.clone();
                let imported = self.imported_templates(&program, &mut diagnostics);
                ast::expand(&mut program, &imported, &mut diagnostics);
                Rc::new(AstStage {
                    program,
                    diagnostics,
                })
            })
            .clone()
    }

    fn imported_templates(
        &self,
        program: &ast::Program,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Template> {
        let mut templates = Vec::new();
        for import in &program.imports {
            match self.file_by_path(&import.path) {
                Some(other) => {
                    templates.extend(self.lower(other).program.templates.iter().cloned());
                }
                None => {
                    diagnostics
                        .report(DiagnosticKind::ExternalFileNotFound, import.origin.span)
                        .message(format!("no file `{}` in this session", import.path))
                        .emit();
                }
            }
        }
        templates
    }

    /// Name resolution + inference. Requires a context type to be set.
    pub fn resolve(&self, id: FileId) -> Rc<ResolveStage> {
        let entry = self.entry(id);
        entry
            .resolve
            .get_or_init(|| {
                let ast = self.ast(id);
                let mut diagnostics = Diagnostics::new();
                let model = match &self.schema {
                    Some(schema) => {
                        let schema = schema.clone();
                        guard_phase(
                            &mut diagnostics,
                            AssertUnwindSafe(|| {
                                let mut local = Diagnostics::new();
                                let model =
                                    analyze::resolve(&ast.program, &*schema, &mut local);
                                (model, local)
                            }),
                        )
                    }
                    None => {
                        diagnostics
                            .report(
                                DiagnosticKind::MissingInterface,
                                TextRange::empty(0.into()),
                            )
                            .message("no context type has been configured")
                            .emit();
                        SemanticModel::default()
                    }
                };
                Rc::new(ResolveStage { model, diagnostics })
            })
            .clone()
    }

    /// Type checking; diagnostics only.
    pub fn type_check(&self, id: FileId) -> Rc<Diagnostics> {
        let entry = self.entry(id);
        entry
            .type_check
            .get_or_init(|| {
                let ast = self.ast(id);
                let resolved = self.resolve(id);
                let mut diagnostics = Diagnostics::new();
                if let Some(schema) = &self.schema {
                    let schema = schema.clone();
                    let () = guard_phase(
                        &mut diagnostics,
                        AssertUnwindSafe(|| {
                            let mut local = Diagnostics::new();
                            analyze::check(
                                &ast.program,
                                &resolved.model,
                                &*schema,
                                &mut local,
                            );
                            ((), local)
                        }),
                    );
                }
                Rc::new(diagnostics)
            })
            .clone()
    }

    /// IR for every tree in the file. Meaningful only when
    /// [`QueryStore::is_valid`] holds.
    pub fn emit_ir(&self, id: FileId) -> Rc<IrModule> {
        let entry = self.entry(id);
        entry
            .ir
            .get_or_init(|| {
                let ast = self.ast(id);
                let resolved = self.resolve(id);
                Rc::new(compile::lower_program(&ast.program, &resolved.model))
            })
            .clone()
    }

    /// Every diagnostic from every stage, in pipeline order.
    pub fn all_diagnostics(&self, id: FileId) -> Diagnostics {
        let mut all = Diagnostics::new();
        all.extend(self.parse(id).diagnostics.clone());
        all.extend(self.ast(id).diagnostics.clone());
        all.extend(self.resolve(id).diagnostics.clone());
        all.extend((*self.type_check(id)).clone());
        all
    }

    /// Whether the file's IR may be handed to consumers.
    pub fn is_valid(&self, id: FileId) -> bool {
        !self.all_diagnostics(id).has_errors()
    }
}

/// Runs one analysis phase, converting a panic into an `internal-error`
/// diagnostic with the prior cached value left untouched.
fn guard_phase<T: Default>(
    diagnostics: &mut Diagnostics,
    phase: AssertUnwindSafe<impl FnOnce() -> (T, Diagnostics)>,
) -> T {
    match catch_unwind(phase) {
        Ok((value, local)) => {
            diagnostics.extend(local);
            value
        }
        Err(_) => {
            diagnostics
                .report(DiagnosticKind::InternalError, TextRange::empty(0.into()))
                .message("analysis phase panicked; this is a compiler bug")
                .emit();
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::agent_schema;

    fn store_with(source: &str) -> (QueryStore, FileId) {
        let mut store = QueryStore::new();
        let id = store.add_file(Some("main.crisp"), source);
        store.set_context_type(agent_schema());
        (store, id)
    }

    #[test]
    fn pipeline_end_to_end() {
        let (store, id) = store_with(
            "(tree T (select (seq (check (< .Health 30)) (.Flee)) (.Patrol)))",
        );
        assert!(store.is_valid(id));
        let ir = store.emit_ir(id);
        assert!(ir.tree("T").is_some());
    }

    #[test]
    fn stages_are_memoized() {
        let (store, id) = store_with("(tree T (.Patrol))");
        let first = store.parse(id);
        let second = store.parse(id);
        assert!(Rc::ptr_eq(&first, &second));

        let ir_a = store.emit_ir(id);
        let ir_b = store.emit_ir(id);
        assert!(Rc::ptr_eq(&ir_a, &ir_b));
    }

    #[test]
    fn set_source_text_invalidates_everything() {
        let (mut store, id) = store_with("(tree T (.Patrol))");
        let before = store.parse(id);
        assert!(store.emit_ir(id).tree("T").is_some());

        store.set_source_text(id, "(tree U (.Flee))");
        let after = store.parse(id);
        assert!(!Rc::ptr_eq(&before, &after));
        assert!(store.emit_ir(id).tree("U").is_some());
        assert!(store.emit_ir(id).tree("T").is_none());
    }

    #[test]
    fn set_context_type_preserves_syntax_stages() {
        let (mut store, id) = store_with("(tree T (.Patrol))");
        let parse_before = store.parse(id);
        let resolve_before = store.resolve(id);

        store.set_context_type(agent_schema());
        let parse_after = store.parse(id);
        let resolve_after = store.resolve(id);

        assert!(Rc::ptr_eq(&parse_before, &parse_after));
        assert!(!Rc::ptr_eq(&resolve_before, &resolve_after));
    }

    #[test]
    fn missing_context_is_reported_not_crashed() {
        let mut store = QueryStore::new();
        let id = store.add_file(None, "(tree T (.Patrol))");
        let diagnostics = store.all_diagnostics(id);
        assert!(diagnostics.has_errors());
        assert_eq!(
            diagnostics
                .of_kind(DiagnosticKind::MissingInterface)
                .len(),
            1
        );
    }

    #[test]
    fn imports_bring_templates_into_scope() {
        let mut store = QueryStore::new();
        store.add_file(
            Some("lib.crisp"),
            "(defdec limited (s) (timeout s <body>))",
        );
        let main = store.add_file(
            Some("main.crisp"),
            "(import \"lib.crisp\")\n(tree T (limited 1.5 (.Patrol)))",
        );
        store.set_context_type(agent_schema());
        assert!(
            store.is_valid(main),
            "{}",
            store.all_diagnostics(main).printer().render()
        );
    }

    #[test]
    fn unknown_import_is_reported() {
        let mut store = QueryStore::new();
        let main = store.add_file(None, "(import \"ghost.crisp\")\n(tree T (.Patrol))");
        store.set_context_type(agent_schema());
        let diagnostics = store.all_diagnostics(main);
        assert_eq!(
            diagnostics
                .of_kind(DiagnosticKind::ExternalFileNotFound)
                .len(),
            1
        );
    }

    #[test]
    fn remove_file_drops_every_derived_value() {
        let (mut store, id) = store_with("(tree T (.Patrol))");
        assert!(store.source_text(id).is_some());
        store.remove_file(id);
        assert!(store.source_text(id).is_none());
        assert!(store.file_ids().is_empty());
    }
}
