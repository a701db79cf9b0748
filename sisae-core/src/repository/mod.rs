/*!
Data-access port for the live sanction and user collections.

The backup engine never talks to a database directly; it reads and writes the
live data set through [`SanctionRepository`]. Two adapters ship with the
crate: [`MemoryRepository`] and [`JsonFileRepository`], which persists the
same state to a single data file.
*/

pub mod file;
pub mod memory;

use crate::model::{
    ClubSanction, Collection, NewClubSanction, NewPersonalSanction, PersonalSanction, User,
};
use crate::Result;
use async_trait::async_trait;

pub use file::JsonFileRepository;
pub use memory::{DataSet, MemoryRepository};

/// Operations the backup engine needs from the live data store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SanctionRepository: Send + Sync {
    /// All club sanctions, highest record number first
    async fn club_sanctions(&self) -> Result<Vec<ClubSanction>>;

    /// All personal sanctions, highest record number first
    async fn personal_sanctions(&self) -> Result<Vec<PersonalSanction>>;

    /// All users, oldest first
    async fn users(&self) -> Result<Vec<User>>;

    /// Highest record number present in a collection, `None` when empty
    async fn max_sequence(&self, collection: Collection) -> Result<Option<u32>>;

    /// Insert a club sanction under the given record number
    ///
    /// A fresh id and creation timestamp are generated. Uniqueness of
    /// `numero_carga` is not checked.
    async fn insert_club_sanction(
        &self,
        sanction: NewClubSanction,
        numero_carga: u32,
    ) -> Result<ClubSanction>;

    /// Insert a personal sanction under the given record number
    ///
    /// The inserted record always starts with `reportada_en_pdf == false`.
    async fn insert_personal_sanction(
        &self,
        sanction: NewPersonalSanction,
        numero_carga: u32,
    ) -> Result<PersonalSanction>;

    /// Flag personal sanctions as included in a compliance report
    async fn mark_personal_sanctions_reported(&self, ids: Vec<String>) -> Result<()>;

    /// Personal sanctions that ended before `today` (`YYYY-MM-DD`) and were
    /// never reported, highest record number first
    async fn expired_unreported_personal_sanctions(
        &self,
        today: &str,
    ) -> Result<Vec<PersonalSanction>> {
        let mut expired: Vec<PersonalSanction> = self
            .personal_sanctions()
            .await?
            .into_iter()
            .filter(|s| !s.reportada_en_pdf && s.fecha_fin.as_str() < today)
            .collect();
        expired.sort_by(|a, b| b.numero_carga.cmp(&a.numero_carga));
        Ok(expired)
    }

    /// Delete every club and personal sanction; users are left untouched
    async fn clear_sanctions(&self) -> Result<()>;
}
