//! Line of sight and fog of war

use glam::Vec2;

use super::location::Location;
use crate::consts::VISIBILITY_INSET;
use crate::geometry::FloorRegion;

impl Location {
    /// Can an observer at `src` see `dest`?
    ///
    /// Always true within melee range, never beyond perception range, and in
    /// between only if a zero-width sight line is unobstructed.
    pub fn visibility_test(&self, src: Vec2, dest: Vec2) -> bool {
        let dist = (dest - src).length();
        if dist <= self.settings.melee_range {
            return true;
        }
        if dist > self.settings.perception_range {
            return false;
        }
        self.is_clear(src, dest, 0.0, &self.visibility_filter())
    }

    fn region_seen_from(&self, region: &FloorRegion, observer: Vec2) -> bool {
        if region.point_inside(observer) {
            return true;
        }
        let centroid = region.polygon().centroid();
        if self.visibility_test(observer, centroid) {
            return true;
        }
        // Only corners at an opening can give a view into a new room
        (0..region.n_points())
            .filter(|&i| region.corner_borders_internal_edge(i))
            .map(|i| {
                let p = region.point(i);
                p + (centroid - p).normalize_or_zero() * VISIBILITY_INSET
            })
            .any(|p| self.visibility_test(observer, p))
    }

    /// Reveal every region the observer can now see
    ///
    /// Returns the indices of regions that were hidden until this call.
    pub fn update_visibility(&mut self, observer: Vec2) -> Vec<usize> {
        let range = self.settings.perception_range;
        let revealed: Vec<usize> = self
            .regions
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.is_visible() && r.bounding_box().distance_to(observer) <= range)
            .filter(|(_, r)| self.region_seen_from(r, observer))
            .map(|(i, _)| i)
            .collect();
        for &i in &revealed {
            self.regions[i].set_visible(true);
        }
        if !revealed.is_empty() {
            log::debug!("Revealed regions {:?} from {:?}", revealed, observer);
        }
        revealed
    }

    /// Mark the whole map as seen
    pub fn reveal_map(&mut self) {
        self.regions.iter_mut().for_each(|r| r.set_visible(true));
    }

    pub fn clear_visibility(&mut self) {
        self.regions.iter_mut().for_each(|r| r.set_visible(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::{LocationBuilder, Obstacle};
    use crate::settings::NavSettings;

    fn rooms_and_corridor() -> Location {
        let mut builder = LocationBuilder::default();
        builder.add_room(0.0, 0.0, 5.0, 5.0).unwrap();
        builder.add_room(5.0, 3.0, 5.0, 1.0).unwrap();
        builder.add_room(10.0, 1.0, 4.0, 3.0).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_visibility_ranges() {
        let mut builder = LocationBuilder::default();
        builder.add_room(0.0, 0.0, 20.0, 10.0).unwrap();
        let mut location = builder.build().unwrap();

        let a = Vec2::new(2.0, 5.0);
        let b = Vec2::new(7.0, 5.0);
        assert!(location.visibility_test(a, b));
        assert!(!location.visibility_test(a, Vec2::new(15.0, 5.0)));

        location
            .edit()
            .add_obstacle(Obstacle::scenery(Vec2::new(4.5, 5.0), 1.0, 1.0))
            .unwrap();
        assert!(!location.visibility_test(a, b));
        assert!(!location.visibility_test(b, a));
        // Melee range ignores walls
        assert!(location.visibility_test(Vec2::new(3.7, 5.0), Vec2::new(4.3, 5.0)));
    }

    #[test]
    fn test_fixed_agents_do_not_block_sight() {
        let mut builder = LocationBuilder::default();
        builder.add_room(0.0, 0.0, 10.0, 10.0).unwrap();
        builder.add_obstacle(Obstacle::fixed_agent(Vec2::new(5.0, 5.0), 0.25));
        let location = builder.build().unwrap();
        assert!(location.visibility_test(Vec2::new(2.0, 5.0), Vec2::new(8.0, 5.0)));
        assert!(
            location
                .intersect_swept_square_with_boundaries(
                    Vec2::new(2.0, 5.0),
                    Vec2::new(8.0, 5.0),
                    0.25,
                    &location.movement_filter(false),
                    crate::nav::HitMode::Earliest,
                )
                .is_some()
        );
    }

    #[test]
    fn test_update_visibility_reveals_through_doorway() {
        let mut location = rooms_and_corridor();
        let revealed = location.update_visibility(Vec2::new(1.0, 1.0));
        assert_eq!(revealed, vec![0, 1]);
        assert!(!location.regions()[2].is_visible());
        // Nothing new from the same spot
        assert!(location.update_visibility(Vec2::new(1.0, 1.0)).is_empty());

        // Walking down the corridor shows the far room
        assert_eq!(location.update_visibility(Vec2::new(7.5, 3.5)), vec![2]);
    }

    #[test]
    fn test_reveal_and_clear() {
        let mut location = rooms_and_corridor();
        location.reveal_map();
        assert!(location.regions().iter().all(|r| r.is_visible()));
        assert!(location.update_visibility(Vec2::new(1.0, 1.0)).is_empty());
        location.clear_visibility();
        assert!(location.regions().iter().all(|r| !r.is_visible()));
    }

    #[test]
    fn test_outdoor_sight_ignores_floor_edges() {
        // Two fields joined only at a corner; indoors the corner pinches sight
        let mut builder = LocationBuilder::new(NavSettings::outdoors());
        builder.add_room(0.0, 0.0, 4.0, 4.0).unwrap();
        builder.add_room(4.0, 4.0, 4.0, 4.0).unwrap();
        let location = builder.build().unwrap();
        assert!(location.visibility_test(Vec2::new(1.0, 3.0), Vec2::new(6.0, 7.0)));

        let mut builder = LocationBuilder::default();
        builder.add_room(0.0, 0.0, 4.0, 4.0).unwrap();
        builder.add_room(4.0, 4.0, 4.0, 4.0).unwrap();
        let location = builder.build().unwrap();
        assert!(!location.visibility_test(Vec2::new(1.0, 3.0), Vec2::new(6.0, 7.0)));
    }
}
