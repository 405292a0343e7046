//! The compositor scene: a tree of views with damage and hit testing

use std::collections::HashMap;
use std::hash::Hash;

use crate::geometry::{Point, Rectangle, Size};

/// Identifies a view in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(usize);

/// A node of the scene tree
#[derive(Debug)]
pub struct View<S> {
    /// the surface this view displays
    pub surface: S,
    /// parent view, if not a root
    pub parent: Option<ViewId>,
    /// ordered children, bottom to top
    pub children: Vec<ViewId>,
    /// position in the global space
    pub position: Point,
    /// size of the view
    pub size: Size,
    /// whether the view is currently shown
    pub mapped: bool,
    /// accumulated damage in view-local coordinates
    pub damage: Vec<Rectangle>,
}

impl<S> View<S> {
    /// The rectangle the view covers in the global space
    pub fn bounds(&self) -> Rectangle {
        Rectangle::from_loc_and_size(self.position, self.size)
    }
}

/// The scene graph
///
/// Views form a tree; roots are stacked in insertion order, with later
/// views on top. Hit testing walks the stack from the top down.
#[derive(Debug)]
pub struct Scene<S> {
    views: Vec<Option<View<S>>>,
    /// root views in stacking order, bottom to top
    stacking: Vec<ViewId>,
    by_surface: HashMap<S, ViewId>,
}

impl<S: Clone + Eq + Hash> Default for Scene<S> {
    fn default() -> Self {
        Self { views: Vec::new(), stacking: Vec::new(), by_surface: HashMap::new() }
    }
}

impl<S: Clone + Eq + Hash> Scene<S> {
    /// An empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a view for a surface at the top of the stack
    pub fn create_view(&mut self, surface: S) -> ViewId {
        let view = View {
            surface: surface.clone(),
            parent: None,
            children: Vec::new(),
            position: Point::default(),
            size: Size::default(),
            mapped: false,
            damage: Vec::new(),
        };
        let id = match self.views.iter().position(Option::is_none) {
            Some(idx) => {
                self.views[idx] = Some(view);
                ViewId(idx)
            }
            None => {
                self.views.push(Some(view));
                ViewId(self.views.len() - 1)
            }
        };
        self.stacking.push(id);
        self.by_surface.insert(surface, id);
        id
    }

    /// Attach a view as the topmost child of a parent
    pub fn set_parent(&mut self, id: ViewId, parent: ViewId) {
        if self.get(id).is_none() || self.get(parent).is_none() || id == parent {
            return;
        }
        if let Some(old_parent) = self.get(id).and_then(|v| v.parent) {
            if let Some(old) = self.get_mut(old_parent) {
                old.children.retain(|&c| c != id);
            }
        }
        self.stacking.retain(|&v| v != id);
        if let Some(view) = self.get_mut(id) {
            view.parent = Some(parent);
        }
        if let Some(parent_view) = self.get_mut(parent) {
            parent_view.children.push(id);
        }
    }

    /// Access a view
    pub fn get(&self, id: ViewId) -> Option<&View<S>> {
        self.views.get(id.0).and_then(Option::as_ref)
    }

    /// Mutably access a view
    pub fn get_mut(&mut self, id: ViewId) -> Option<&mut View<S>> {
        self.views.get_mut(id.0).and_then(Option::as_mut)
    }

    /// The view displaying a surface
    pub fn view_for_surface(&self, surface: &S) -> Option<ViewId> {
        self.by_surface.get(surface).copied()
    }

    /// Show the view at a position with a size
    ///
    /// The whole view is damaged, as its previous content is unknown.
    pub fn map(&mut self, id: ViewId, x: i32, y: i32, w: i32, h: i32) {
        if let Some(view) = self.get_mut(id) {
            view.position = Point::new(x, y);
            view.size = Size::new(w, h);
            view.mapped = true;
            if w > 0 && h > 0 {
                view.damage.push(Rectangle::new(0, 0, w, h));
            }
        }
    }

    /// Hide the view
    pub fn unmap(&mut self, id: ViewId) {
        if let Some(view) = self.get_mut(id) {
            view.mapped = false;
            view.damage.clear();
        }
    }

    /// Move the view
    pub fn move_view(&mut self, id: ViewId, x: i32, y: i32) {
        if let Some(view) = self.get_mut(id) {
            view.position = Point::new(x, y);
        }
    }

    /// Resize the view
    pub fn resize(&mut self, id: ViewId, w: i32, h: i32) {
        if let Some(view) = self.get_mut(id) {
            view.size = Size::new(w, h);
        }
    }

    /// Accumulate damage on the view
    pub fn damage_view(&mut self, id: ViewId, rect: Rectangle) {
        if let Some(view) = self.get_mut(id) {
            if !rect.is_empty() {
                view.damage.push(rect);
            }
        }
    }

    /// Clear the damage of every view, after a frame was assembled
    pub fn clear_damage(&mut self) {
        for view in self.views.iter_mut().flatten() {
            view.damage.clear();
        }
    }

    /// Raise a root view to the top of the stack
    pub fn raise(&mut self, id: ViewId) {
        if let Some(pos) = self.stacking.iter().position(|&v| v == id) {
            self.stacking.remove(pos);
            self.stacking.push(id);
        }
    }

    /// Remove a view (and detach its children, which become roots)
    pub fn destroy_view(&mut self, id: ViewId) {
        let Some(view) = self.views.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        self.stacking.retain(|&v| v != id);
        self.by_surface.remove(&view.surface);
        if let Some(parent) = view.parent {
            if let Some(parent_view) = self.get_mut(parent) {
                parent_view.children.retain(|&c| c != id);
            }
        }
        for child in view.children {
            if let Some(child_view) = self.get_mut(child) {
                child_view.parent = None;
                self.stacking.push(child);
            }
        }
    }

    /// The topmost mapped view containing the point
    ///
    /// Ties are broken by stacking order: the view most recently raised or
    /// added wins. Children are checked before their parent, topmost first.
    pub fn find_view_at(&self, x: i32, y: i32) -> Option<ViewId> {
        let p = Point::new(x, y);
        for &root in self.stacking.iter().rev() {
            if let Some(found) = self.find_in_subtree(root, p) {
                return Some(found);
            }
        }
        None
    }

    fn find_in_subtree(&self, id: ViewId, p: Point) -> Option<ViewId> {
        let view = self.get(id)?;
        if !view.mapped {
            return None;
        }
        for &child in view.children.iter().rev() {
            if let Some(found) = self.find_in_subtree(child, p) {
                return Some(found);
            }
        }
        view.bounds().contains(p).then_some(id)
    }

    /// Mapped views in paint order (bottom to top), for the renderer
    pub fn paint_order(&self) -> Vec<ViewId> {
        let mut order = Vec::new();
        for &root in &self.stacking {
            self.collect_subtree(root, &mut order);
        }
        order
    }

    fn collect_subtree(&self, id: ViewId, order: &mut Vec<ViewId>) {
        let Some(view) = self.get(id) else { return };
        if !view.mapped {
            return;
        }
        order.push(id);
        for &child in &view.children {
            self.collect_subtree(child, order);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_test_respects_stacking() {
        let mut scene: Scene<u32> = Scene::new();
        let a = scene.create_view(1);
        let b = scene.create_view(2);
        scene.map(a, 0, 0, 100, 100);
        scene.map(b, 50, 50, 100, 100);
        // over the overlap, the later view wins
        assert_eq!(scene.find_view_at(75, 75), Some(b));
        assert_eq!(scene.find_view_at(25, 25), Some(a));
        assert_eq!(scene.find_view_at(200, 200), None);
        // raising A moves it on top
        scene.raise(a);
        assert_eq!(scene.find_view_at(75, 75), Some(a));
    }

    #[test]
    fn unmapped_views_are_invisible() {
        let mut scene: Scene<u32> = Scene::new();
        let a = scene.create_view(1);
        scene.map(a, 0, 0, 100, 100);
        assert_eq!(scene.find_view_at(10, 10), Some(a));
        scene.unmap(a);
        assert_eq!(scene.find_view_at(10, 10), None);
    }

    #[test]
    fn children_hit_before_parents() {
        let mut scene: Scene<u32> = Scene::new();
        let parent = scene.create_view(1);
        let child = scene.create_view(2);
        scene.set_parent(child, parent);
        scene.map(parent, 0, 0, 100, 100);
        scene.map(child, 10, 10, 20, 20);
        assert_eq!(scene.find_view_at(15, 15), Some(child));
        assert_eq!(scene.find_view_at(50, 50), Some(parent));
        // paint order walks parents before children
        assert_eq!(scene.paint_order(), vec![parent, child]);
    }

    #[test]
    fn damage_accumulates_and_clears() {
        let mut scene: Scene<u32> = Scene::new();
        let a = scene.create_view(1);
        scene.map(a, 0, 0, 100, 100);
        scene.damage_view(a, Rectangle::new(0, 0, 10, 10));
        scene.damage_view(a, Rectangle::new(20, 20, 10, 10));
        // map itself damages the full view
        assert_eq!(scene.get(a).unwrap().damage.len(), 3);
        scene.clear_damage();
        assert!(scene.get(a).unwrap().damage.is_empty());
    }

    #[test]
    fn destroy_detaches_children() {
        let mut scene: Scene<u32> = Scene::new();
        let parent = scene.create_view(1);
        let child = scene.create_view(2);
        scene.set_parent(child, parent);
        scene.map(parent, 0, 0, 100, 100);
        scene.map(child, 0, 0, 10, 10);
        scene.destroy_view(parent);
        assert_eq!(scene.view_for_surface(&1), None);
        // the child survives as a root
        assert_eq!(scene.find_view_at(5, 5), Some(child));
    }
}
