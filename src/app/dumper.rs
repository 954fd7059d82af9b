use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::app::error::{DumpError, WriteError};
use crate::app::formatter::{SEPARATOR, SqlGenerator};
use crate::app::models::ForeignKeyInfo;
use crate::app::provider::MetadataProvider;
use crate::app::quote::double_quotify;

#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Tables and views left out of the dump entirely.
    pub ignore_tables: Vec<String>,
    /// Replace a failing table or view with a comment instead of aborting.
    pub skip_failed: bool,
}

// It turns provider metadata into the dump script.
pub struct Dumper<'a, P: MetadataProvider + ?Sized> {
    provider: &'a P,
    options: DumpOptions,
}

impl<'a, P: MetadataProvider + ?Sized> Dumper<'a, P> {
    pub fn new(provider: &'a P, options: DumpOptions) -> Self {
        Self { provider, options }
    }

    pub async fn table_names(&self) -> Result<Vec<String>, DumpError> {
        let names = self
            .provider
            .table_names()
            .await
            .map_err(DumpError::metadata("table list"))?;
        Ok(self.without_ignored(names))
    }

    pub async fn view_names(&self) -> Result<Vec<String>, DumpError> {
        let names = self
            .provider
            .view_names()
            .await
            .map_err(DumpError::metadata("view list"))?;
        Ok(self.without_ignored(names))
    }

    pub async fn ddl_for_table(&self, table: &str) -> Result<String, DumpError> {
        let foreign_keys = self
            .provider
            .foreign_keys_of(table)
            .await
            .map_err(DumpError::metadata(table))?;
        self.table_ddl(table, &foreign_keys).await
    }

    pub async fn ddl_for_view(&self, view: &str) -> Result<String, DumpError> {
        let columns = self
            .provider
            .columns_of(view)
            .await
            .map_err(DumpError::metadata(view))?;

        Ok(SqlGenerator::create_view_table(view, &columns)?)
    }

    pub async fn inserts_for_table(&self, table: &str) -> Result<String, DumpError> {
        let scan = self.provider.scan(table).await.map_err(DumpError::scan(table))?;
        SqlGenerator::insert_statements(table, table, &scan)
    }

    pub async fn inserts_for_view(&self, view: &str) -> Result<String, DumpError> {
        let scan = self.provider.scan(view).await.map_err(DumpError::scan(view))?;
        SqlGenerator::insert_statements(view, &SqlGenerator::view_table_name(view), &scan)
    }

    /// CREATE INDEX statements for every table, newline separated.
    pub async fn database_indexes(&self) -> Result<String, DumpError> {
        let tables = self.table_names().await?;
        let mut skipped = Vec::new();
        self.index_block(&tables, &HashSet::new(), &mut skipped).await
    }

    /// The whole script: tables, then foreign keys that could not be
    /// declared inline, then views, then indexes. Tables come parents
    /// first, so every row loads after the rows it references. An empty
    /// database produces an empty script.
    pub async fn dump_string(&self) -> Result<String, DumpError> {
        let tables = self.table_names().await?;
        let views = self.view_names().await?;
        let mut output = String::new();
        let mut skipped = Vec::new();

        let mut with_foreign_keys = Vec::with_capacity(tables.len());
        for table in &tables {
            match self.provider.foreign_keys_of(table).await {
                Ok(foreign_keys) => with_foreign_keys.push((table.clone(), foreign_keys)),
                Err(source) => {
                    let err = DumpError::metadata(table)(source);
                    self.skip_or_abort(table, err, &mut output, &mut skipped)?;
                }
            }
        }

        let mut created = Vec::new();
        for planned in creation_order(with_foreign_keys) {
            debug!(table = planned.name.as_str(), "Dumping table");
            match self.table_fragment(&planned.name, &planned.inline).await {
                Ok(fragment) => {
                    output.push_str(&fragment);
                    created.push(planned);
                }
                Err(err) => self.skip_or_abort(&planned.name, err, &mut output, &mut skipped)?,
            }
        }

        let mut deferred = Vec::new();
        for planned in &created {
            let foreign_keys: Vec<ForeignKeyInfo> = planned
                .deferred
                .iter()
                .filter(|fk| !skipped.contains(&fk.foreign_table_name))
                .cloned()
                .collect();
            deferred.extend(SqlGenerator::add_foreign_keys(&planned.name, &foreign_keys));
        }
        if !deferred.is_empty() {
            write!(output, "{}{SEPARATOR}", deferred.join("\n"))?;
        }

        for view in &views {
            debug!(view = view.as_str(), "Dumping view");
            match self.view_fragment(view).await {
                Ok(fragment) => output.push_str(&fragment),
                Err(err) => self.skip_or_abort(view, err, &mut output, &mut skipped)?,
            }
        }

        // Skipped tables get no indexes.
        let skipped_tables: HashSet<String> = skipped.iter().cloned().collect();
        let indexes = self.index_block(&tables, &skipped_tables, &mut skipped).await?;
        output.push_str(&indexes);

        info!(
            tables = tables.len(),
            views = views.len(),
            deferred_foreign_keys = deferred.len(),
            skipped = skipped.len(),
            bytes = output.len(),
            "Dump generated"
        );
        Ok(output)
    }

    /// Generates the dump, then writes it to `path`. Nothing is created or
    /// truncated when generation fails.
    pub async fn write_dump_to(&self, path: &Path) -> Result<(), WriteError> {
        let dump = self.dump_string().await?;
        let destination = path.display().to_string();

        let file = File::create(path).await.map_err(|source| WriteError::Io {
            destination: destination.clone(),
            source,
        })?;
        Self::write_all(BufWriter::new(file), &dump, &destination).await
    }

    /// Generates the dump, then writes it to an already open stream.
    pub async fn write_dump<W: AsyncWrite + Unpin>(
        &self,
        writer: W,
        destination: &str,
    ) -> Result<(), WriteError> {
        let dump = self.dump_string().await?;
        Self::write_all(writer, &dump, destination).await
    }

    async fn write_all<W: AsyncWrite + Unpin>(
        mut writer: W,
        dump: &str,
        destination: &str,
    ) -> Result<(), WriteError> {
        let io_error = |source| WriteError::Io {
            destination: destination.to_string(),
            source,
        };
        writer.write_all(dump.as_bytes()).await.map_err(io_error)?;
        writer.flush().await.map_err(io_error)
    }

    async fn table_ddl(
        &self,
        table: &str,
        foreign_keys: &[ForeignKeyInfo],
    ) -> Result<String, DumpError> {
        let metadata = DumpError::metadata;
        let columns = self.provider.columns_of(table).await.map_err(metadata(table))?;
        let primary_keys = self
            .provider
            .primary_keys_of(table)
            .await
            .map_err(metadata(table))?;

        Ok(SqlGenerator::create_table(
            table,
            &columns,
            &primary_keys,
            foreign_keys,
        )?)
    }

    async fn table_fragment(
        &self,
        table: &str,
        foreign_keys: &[ForeignKeyInfo],
    ) -> Result<String, DumpError> {
        let ddl = self.table_ddl(table, foreign_keys).await?;
        let inserts = self.inserts_for_table(table).await?;
        Ok(format!("{ddl}{SEPARATOR}{inserts}{SEPARATOR}"))
    }

    async fn view_fragment(&self, view: &str) -> Result<String, DumpError> {
        let ddl = self.ddl_for_view(view).await?;
        let inserts = self.inserts_for_view(view).await?;
        Ok(format!("{ddl}{SEPARATOR}{inserts}{SEPARATOR}"))
    }

    async fn index_block(
        &self,
        tables: &[String],
        exclude: &HashSet<String>,
        skipped: &mut Vec<String>,
    ) -> Result<String, DumpError> {
        let mut statements = Vec::new();
        let mut comments = String::new();

        for table in tables.iter().filter(|t| !exclude.contains(*t)) {
            let generated = match self.provider.indexes_of(table).await {
                Ok(indexes) => SqlGenerator::create_indexes(&indexes),
                Err(source) => Err(DumpError::metadata(table)(source)),
            };
            match generated {
                Ok(mut table_statements) => statements.append(&mut table_statements),
                Err(err) => self.skip_or_abort(table, err, &mut comments, skipped)?,
            }
        }

        let mut block = statements.join("\n");
        if !block.is_empty() && !comments.is_empty() {
            block.push('\n');
        }
        block.push_str(&comments);
        Ok(block)
    }

    fn skip_or_abort(
        &self,
        object: &str,
        err: DumpError,
        output: &mut String,
        skipped: &mut Vec<String>,
    ) -> Result<(), DumpError> {
        if !self.options.skip_failed {
            return Err(err);
        }

        warn!(object, error = %err, "Skipping object");
        let reason = err.to_string().replace(['\r', '\n'], " ");
        writeln!(output, "-- skipped {}: {}", double_quotify(object), reason)?;
        skipped.push(object.to_string());
        Ok(())
    }

    fn without_ignored(&self, names: Vec<String>) -> Vec<String> {
        names
            .into_iter()
            .filter(|name| !self.options.ignore_tables.contains(name))
            .collect()
    }
}

/// A table in creation order, with its foreign keys split into those
/// declared in CREATE TABLE and those added once every table exists.
#[derive(Debug, PartialEq)]
struct PlannedTable {
    name: String,
    inline: Vec<ForeignKeyInfo>,
    deferred: Vec<ForeignKeyInfo>,
}

/// Orders tables so referenced tables come first, keeping the given order
/// among tables that are free to go. References to tables outside the dump
/// never hold a table back. A self reference, or a reference that closes a
/// cycle, is deferred instead of declared inline.
fn creation_order(tables: Vec<(String, Vec<ForeignKeyInfo>)>) -> Vec<PlannedTable> {
    let dumped: HashSet<String> = tables.iter().map(|(name, _)| name.clone()).collect();
    let mut created: HashSet<String> = HashSet::with_capacity(tables.len());
    let mut remaining = tables;
    let mut order = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let ready = remaining.iter().position(|(name, foreign_keys)| {
            foreign_keys.iter().all(|fk| {
                let parent = &fk.foreign_table_name;
                parent == name || !dumped.contains(parent) || created.contains(parent)
            })
        });
        // Only a cycle leaves no table ready; break it at the first one.
        let (name, foreign_keys) = remaining.remove(ready.unwrap_or(0));

        let (inline, deferred): (Vec<_>, Vec<_>) = foreign_keys.into_iter().partition(|fk| {
            let parent = &fk.foreign_table_name;
            *parent != name && (!dumped.contains(parent) || created.contains(parent))
        });
        created.insert(name.clone());
        order.push(PlannedTable {
            name,
            inline,
            deferred,
        });
    }
    order
}
