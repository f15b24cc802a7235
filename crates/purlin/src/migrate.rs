//! Applying a delta through an adapter.
//!
//! One adapter call per operation (one per composite in bulk mode),
//! strictly in delta order. The first adapter error aborts the run;
//! already-applied operations stay applied - rollback is whatever the
//! engine's transactional-DDL story provides, which the adapter reports
//! but this layer does not manage.

use crate::adapter::Adapter;
use crate::delta::{Delta, Operation};
use crate::error::Error;

pub(crate) fn apply(delta: &Delta, adapter: &mut dyn Adapter) -> Result<(), Error> {
    for op in delta.operations() {
        tracing::info!(operation = op.kind_name(), table = op.table_name(), "{op}");
        tracing::debug!("{}", op.render());
        apply_op(op, adapter)?;
    }
    Ok(())
}

fn apply_op(op: &Operation, adapter: &mut dyn Adapter) -> Result<(), Error> {
    match op {
        Operation::CreateTable { table } => adapter.create_table(table)?,
        Operation::DropTable { table } => adapter.drop_table(table)?,
        Operation::AddColumn { table, column } => adapter.add_column(table, column)?,
        Operation::RemoveColumn { table, column } => adapter.remove_column(table, column)?,
        Operation::ChangeColumn { table, column } => adapter.change_column(table, column)?,
        Operation::AddIndex { table, index } => adapter.add_index(table, index)?,
        Operation::RemoveIndex { table, index } => adapter.remove_index(table, index)?,
        Operation::AddForeignKey { fk } => adapter.add_foreign_key(fk)?,
        Operation::RemoveForeignKey { fk } => adapter.remove_foreign_key(fk)?,
        Operation::ChangeTableOptions { table, to, .. } => {
            adapter.change_table_options(table, to)?
        }
        Operation::ChangeTable { table, ops } => adapter.alter_table(table, ops)?,
    }
    Ok(())
}
