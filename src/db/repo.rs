use postgres_types::ToSql;

mod account;
mod account_db;
mod gear;
mod gear_db;
mod location;
mod location_db;
mod memory;

pub use account_db::AccountRepository;
pub use gear_db::GearRepository;
pub use location_db::LocationRepository;
pub use memory::MemoryStore;

pub use account::AccountRepo;
pub use gear::GearRepo;
pub use location::{LocationRepo, Subtree};

/// Gear joined with its location. Every gear read goes through this so the
/// location snapshot comes from the same statement as the gear row.
pub(crate) const GEAR_SELECT: &str = r#"
    SELECT
        g.id, g.name, g.description, g.weight, g.cost, g.value, g.legality, g.category, g.location_id,
        l.id AS loc_id, l.name AS loc_name, l.type AS loc_type, l.parent_id AS loc_parent_id
    FROM gear g
    LEFT JOIN locations l ON g.location_id = l.id
"#;

/// Collects the `SET` list of a partial update. Column names are always
/// static strings from this crate, values are bound as parameters.
#[derive(Default)]
pub(crate) struct Assignments {
    cols: Vec<&'static str>,
    params: Vec<Box<dyn ToSql + Sync + Send>>,
}

impl Assignments {
    pub fn push<T>(&mut self, col: &'static str, value: T)
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.cols.push(col);
        self.params.push(Box::new(value));
    }

    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }

    /// `a = $1, b = $2`, numbering from 1. The caller binds the row id as
    /// the next parameter, see `id_placeholder`.
    pub fn set_clause(&self) -> String {
        self.cols
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{c} = ${}", i + 1))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn id_placeholder(&self) -> String {
        format!("${}", self.cols.len() + 1)
    }

    pub fn params<'a>(&'a self, id: &'a (dyn ToSql + Sync)) -> Vec<&'a (dyn ToSql + Sync)> {
        let mut out: Vec<&(dyn ToSql + Sync)> = self
            .params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();
        out.push(id);
        out
    }
}
