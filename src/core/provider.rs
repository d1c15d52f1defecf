//! The relation interface the hierarchy builder is written against.
//!
//! Two backends implement it: the cscope/readtags query client and the
//! regex-built fallback index. The builder never knows which one is active.

use crate::core::{error::HierarchyError, kind::TagEntry, record::SymbolRecord};

pub trait RelationProvider
{
    /// Short backend label for logs and reports.
    fn backend(&self) -> &'static str;

    /// Definition site of `name`, if the index knows it.
    fn find_definition(
        &self,
        name: &str,
    ) -> Result<Option<SymbolRecord>, HierarchyError>;

    /// Call sites of `name`; each record names the calling function.
    fn find_callers(
        &self,
        name: &str,
    ) -> Result<Vec<SymbolRecord>, HierarchyError>;

    /// Functions called by `name`; each record names the callee.
    fn find_callees(
        &self,
        name: &str,
    ) -> Result<Vec<SymbolRecord>, HierarchyError>;

    /// Files with an include directive for `header`.
    fn find_includers(
        &self,
        header: &str,
    ) -> Result<Vec<SymbolRecord>, HierarchyError>;

    /// Files named `name`.
    fn find_file(
        &self,
        name: &str,
    ) -> Result<Vec<SymbolRecord>, HierarchyError>;

    /// Tag entries for `name`, in store order.
    fn tag_entries(
        &self,
        name: &str,
    ) -> Result<Vec<TagEntry>, HierarchyError>;
}
