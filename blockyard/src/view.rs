//! Region and viewpoint queries over a [`BlockStore`].
//!
//! Both kinds of query return [`QueryHit`]s, copies of the matching records; no reference
//! into the store outlives the call.

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::block::{BlockId, BlockRecord};
use crate::config::FieldOfView;
use crate::math::{FreeCoordinate, FreePoint, Rotation, is_finite_point};
use crate::store::BlockStore;

/// Half the diagonal of a unit cube: the farthest any point of a cube is from its center.
const HALF_CUBE_DIAGONAL: FreeCoordinate = 0.8660254037844387;

/// One result of a query.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[non_exhaustive]
pub struct QueryHit {
    /// The matching record.
    #[serde(flatten)]
    pub record: BlockRecord,
    /// Distance from the viewpoint to the center of the record's cube. Present only for
    /// view queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<FreeCoordinate>,
}

/// Where a view query looks from.
#[derive(Clone, Debug, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum ViewOrigin {
    /// An arbitrary point.
    Position(FreePoint),
    /// The center of the cube occupied by the block with this id.
    Block(BlockId),
}

/// Returns every record whose cube lies within `radius` of `center`, in positional order.
///
/// Fails if `radius` is negative or not finite, or if `center` is not finite.
pub fn query_region(
    store: &BlockStore,
    center: FreePoint,
    radius: FreeCoordinate,
) -> Result<Vec<QueryHit>, QueryError> {
    check_distance(radius)?;
    if !is_finite_point(center) {
        return Err(QueryError::InvalidOrigin);
    }
    Ok(store
        .query_region(center, radius)
        .map(|record| QueryHit {
            record: record.clone(),
            distance: None,
        })
        .collect())
}

/// Returns every record whose cube center is within `max_distance` of the origin and
/// inside the view frustum given by `rotation` and `field_of_view`, nearest first.
///
/// Records at equal distance are ordered by position.
pub fn query_view(
    store: &BlockStore,
    field_of_view: FieldOfView,
    origin: &ViewOrigin,
    rotation: Rotation,
    max_distance: FreeCoordinate,
) -> Result<Vec<QueryHit>, QueryError> {
    check_distance(max_distance)?;
    let origin = match origin {
        ViewOrigin::Position(point) => *point,
        ViewOrigin::Block(id) => store
            .lookup_by_id(id)
            .ok_or_else(|| QueryError::UnknownBlockId(id.clone()))?
            .center(),
    };
    if !is_finite_point(origin) || !rotation.is_finite() {
        return Err(QueryError::InvalidOrigin);
    }

    let forward = rotation.forward();
    let right = rotation.right();
    let up = rotation.up();
    let horizontal_slope = (field_of_view.horizontal_degrees / 2.0).to_radians().tan();
    let vertical_slope = (field_of_view.vertical_degrees / 2.0).to_radians().tan();

    let mut hits: Vec<(NotNan<FreeCoordinate>, &BlockRecord)> = store
        .query_region(origin, max_distance + HALF_CUBE_DIAGONAL)
        .filter_map(|record| {
            let offset = record.position().center() - origin;
            let distance = offset.length();
            if distance > max_distance {
                return None;
            }
            let depth = offset.dot(forward);
            let in_frustum = depth > 0.0
                && offset.dot(right).abs() <= depth * horizontal_slope
                && offset.dot(up).abs() <= depth * vertical_slope;
            if !in_frustum {
                return None;
            }
            Some((NotNan::new(distance).ok()?, record))
        })
        .collect();

    // Candidates arrive in positional order, so a stable sort by distance breaks ties
    // by position.
    hits.sort_by_key(|&(distance, _)| distance);

    log::trace!(
        "view query from {origin:?} {rotation:?} within {max_distance}: {} hits",
        hits.len()
    );
    Ok(hits
        .into_iter()
        .map(|(distance, record)| QueryHit {
            record: record.clone(),
            distance: Some(distance.into_inner()),
        })
        .collect())
}

fn check_distance(distance: FreeCoordinate) -> Result<(), QueryError> {
    if distance.is_finite() && distance >= 0.0 {
        Ok(())
    } else {
        Err(QueryError::InvalidDistance(distance))
    }
}

/// Error from [`query_region()`] or [`query_view()`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum QueryError {
    /// The origin block id does not exist.
    #[error("there is no block with id {0}")]
    UnknownBlockId(BlockId),
    /// The radius or maximum distance was negative or not finite.
    #[error("query distance must be finite and non-negative, not {0}")]
    InvalidDistance(FreeCoordinate),
    /// The origin position or rotation was not finite.
    #[error("query origin and rotation must be finite")]
    InvalidOrigin,
}
