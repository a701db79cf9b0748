/*!
Record-number allocation for the sanction collections.

Every sanction carries a `numeroCarga` that is unique within its collection.
Normal creation takes the next free number; restore inserts records under the
number they had when the snapshot was taken.
*/

use crate::model::{
    ClubSanction, Collection, NewClubSanction, NewPersonalSanction, PersonalSanction,
};
use crate::repository::SanctionRepository;
use crate::Result;
use tracing::debug;

/// Allocates and assigns record numbers through a repository
#[derive(Debug)]
pub struct SequenceAllocator<'a, R: ?Sized> {
    repository: &'a R,
}

impl<'a, R> SequenceAllocator<'a, R>
where
    R: SanctionRepository + ?Sized,
{
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    /// One more than the highest number in the collection, 1 when empty
    pub async fn next_number(&self, collection: Collection) -> Result<u32> {
        let max = self.repository.max_sequence(collection).await?;
        Ok(max.unwrap_or(0).saturating_add(1))
    }

    /// Validate and insert a new club sanction under the next free number
    pub async fn create_club_sanction(&self, sanction: NewClubSanction) -> Result<ClubSanction> {
        sanction.validate()?;
        let numero = self.next_number(Collection::Club).await?;
        debug!(numero, "Allocated club sanction number");
        self.repository.insert_club_sanction(sanction, numero).await
    }

    /// Validate and insert a new personal sanction under the next free number
    pub async fn create_personal_sanction(
        &self,
        sanction: NewPersonalSanction,
    ) -> Result<PersonalSanction> {
        sanction.validate()?;
        let numero = self.next_number(Collection::Personal).await?;
        debug!(numero, "Allocated personal sanction number");
        self.repository.insert_personal_sanction(sanction, numero).await
    }

    /// Insert a club sanction under a caller-chosen number
    ///
    /// Only used by restore, which runs against an already-cleared
    /// collection; uniqueness is not re-checked here.
    pub async fn insert_club_with_number(
        &self,
        sanction: NewClubSanction,
        numero: u32,
    ) -> Result<ClubSanction> {
        self.repository.insert_club_sanction(sanction, numero).await
    }

    /// Insert a personal sanction under a caller-chosen number
    ///
    /// The inserted record is unreported; see
    /// [`SanctionRepository::mark_personal_sanctions_reported`].
    pub async fn insert_personal_with_number(
        &self,
        sanction: NewPersonalSanction,
        numero: u32,
    ) -> Result<PersonalSanction> {
        self.repository.insert_personal_sanction(sanction, numero).await
    }
}
