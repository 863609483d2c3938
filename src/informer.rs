//! Watch event translation
//!
//! The kube watcher reports every create or change as `Apply` and replays the
//! full list after each reconnect. The dispatcher needs an Added, then
//! Modified, then Deleted sequence per name, so this module remembers the last
//! snapshot of every cluster it has reported.

use std::collections::{HashMap, HashSet};

use kube::runtime::watcher::Event;
use kube::ResourceExt;
use tracing::debug;

use crate::controller::LifecycleEvent;
use crate::crd::ZookeeperCluster;

/// Turns raw watcher events into ordered lifecycle events
#[derive(Debug, Default)]
pub struct EventTranslator {
    known: HashMap<String, ZookeeperCluster>,
    relisted: Option<HashSet<String>>,
}

impl EventTranslator {
    /// Create a translator that has seen nothing yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clusters currently known
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Returns true if no cluster is known
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Translate one watcher event into zero or more lifecycle events
    pub fn translate(&mut self, event: Event<ZookeeperCluster>) -> Vec<LifecycleEvent> {
        match event {
            Event::Apply(cluster) => self.observe(cluster),
            Event::Delete(cluster) => {
                self.known.remove(&cluster.name_any());
                vec![LifecycleEvent::deleted(cluster)]
            }
            Event::Init => {
                self.relisted = Some(HashSet::new());
                Vec::new()
            }
            Event::InitApply(cluster) => {
                if let Some(seen) = self.relisted.as_mut() {
                    seen.insert(cluster.name_any());
                }
                self.observe(cluster)
            }
            Event::InitDone => self.finish_relist(),
        }
    }

    /// Drop `name` so its next snapshot is reported as Added again
    ///
    /// Used when the dispatcher refused an Added event and holds no record of
    /// the cluster.
    pub fn forget(&mut self, name: &str) {
        if self.known.remove(name).is_some() {
            debug!(cluster = %name, "forgetting cluster");
        }
    }

    /// Record a snapshot, classifying it as new, changed, recreated or a duplicate
    fn observe(&mut self, cluster: ZookeeperCluster) -> Vec<LifecycleEvent> {
        let name = cluster.name_any();
        let Some(previous) = self.known.get(&name) else {
            self.known.insert(name, cluster.clone());
            return vec![LifecycleEvent::added(cluster)];
        };

        if previous.uid().is_some()
            && cluster.uid().is_some()
            && previous.uid() != cluster.uid()
        {
            debug!(cluster = %name, "cluster was recreated");
            let previous = self.known.insert(name, cluster.clone());
            return previous
                .map(LifecycleEvent::deleted)
                .into_iter()
                .chain(std::iter::once(LifecycleEvent::added(cluster)))
                .collect();
        }

        if previous.resource_version().is_some()
            && previous.resource_version() == cluster.resource_version()
        {
            debug!(cluster = %name, "dropping duplicate event");
            return Vec::new();
        }

        self.known.insert(name, cluster.clone());
        vec![LifecycleEvent::modified(cluster)]
    }

    /// Emit deletions for clusters that disappeared while the watch was down
    fn finish_relist(&mut self) -> Vec<LifecycleEvent> {
        let Some(seen) = self.relisted.take() else {
            return Vec::new();
        };

        let mut gone: Vec<String> = self
            .known
            .keys()
            .filter(|name| !seen.contains(*name))
            .cloned()
            .collect();
        gone.sort();

        gone.into_iter()
            .filter_map(|name| self.known.remove(&name))
            .map(LifecycleEvent::deleted)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::EventKind;
    use crate::crd::ZookeeperClusterSpec;

    fn cluster(name: &str, resource_version: &str) -> ZookeeperCluster {
        let mut cluster = ZookeeperCluster::new(name, ZookeeperClusterSpec::default());
        cluster.metadata.resource_version = Some(resource_version.to_string());
        cluster
    }

    fn cluster_with_uid(name: &str, resource_version: &str, uid: &str) -> ZookeeperCluster {
        let mut cluster = cluster(name, resource_version);
        cluster.metadata.uid = Some(uid.to_string());
        cluster
    }

    fn kinds(events: &[LifecycleEvent]) -> Vec<(String, EventKind)> {
        events
            .iter()
            .map(|e| (e.resource.name_any(), e.kind))
            .collect()
    }

    #[test]
    fn test_first_apply_is_added_then_modified() {
        let mut translator = EventTranslator::new();

        let events = translator.translate(Event::Apply(cluster("zk", "1")));
        assert_eq!(kinds(&events), vec![("zk".to_string(), EventKind::Added)]);

        let events = translator.translate(Event::Apply(cluster("zk", "2")));
        assert_eq!(kinds(&events), vec![("zk".to_string(), EventKind::Modified)]);
    }

    #[test]
    fn test_same_resource_version_is_dropped() {
        let mut translator = EventTranslator::new();
        translator.translate(Event::Apply(cluster("zk", "1")));

        assert!(translator
            .translate(Event::Apply(cluster("zk", "1")))
            .is_empty());
    }

    #[test]
    fn test_delete_forgets_cluster() {
        let mut translator = EventTranslator::new();
        translator.translate(Event::Apply(cluster("zk", "1")));

        let events = translator.translate(Event::Delete(cluster("zk", "2")));
        assert_eq!(kinds(&events), vec![("zk".to_string(), EventKind::Deleted)]);
        assert!(translator.is_empty());

        let events = translator.translate(Event::Apply(cluster("zk", "3")));
        assert_eq!(kinds(&events), vec![("zk".to_string(), EventKind::Added)]);
    }

    #[test]
    fn test_initial_list_adds_everything() {
        let mut translator = EventTranslator::new();
        let mut events = translator.translate(Event::Init);
        events.extend(translator.translate(Event::InitApply(cluster("zk-a", "1"))));
        events.extend(translator.translate(Event::InitApply(cluster("zk-b", "1"))));
        events.extend(translator.translate(Event::InitDone));

        assert_eq!(
            kinds(&events),
            vec![
                ("zk-a".to_string(), EventKind::Added),
                ("zk-b".to_string(), EventKind::Added),
            ]
        );
        assert_eq!(translator.len(), 2);
    }

    /// After a reconnect, unchanged clusters are silent, changed ones are
    /// Modified and vanished ones are Deleted with their last snapshot.
    #[test]
    fn test_relist_reconciles_missed_changes() {
        let mut translator = EventTranslator::new();
        translator.translate(Event::Apply(cluster("zk-a", "1")));
        translator.translate(Event::Apply(cluster("zk-b", "1")));
        translator.translate(Event::Apply(cluster("zk-c", "1")));

        let mut events = translator.translate(Event::Init);
        events.extend(translator.translate(Event::InitApply(cluster("zk-a", "1"))));
        events.extend(translator.translate(Event::InitApply(cluster("zk-c", "5"))));
        events.extend(translator.translate(Event::InitDone));

        assert_eq!(
            kinds(&events),
            vec![
                ("zk-c".to_string(), EventKind::Modified),
                ("zk-b".to_string(), EventKind::Deleted),
            ]
        );
        assert_eq!(
            events[1].resource.resource_version().as_deref(),
            Some("1")
        );
        assert_eq!(translator.len(), 2);
    }

    #[test]
    fn test_forgotten_cluster_is_added_again() {
        let mut translator = EventTranslator::new();
        translator.translate(Event::Apply(cluster("zk", "1")));
        translator.forget("zk");
        assert!(translator.is_empty());

        let events = translator.translate(Event::Apply(cluster("zk", "2")));
        assert_eq!(kinds(&events), vec![("zk".to_string(), EventKind::Added)]);

        translator.forget("never-seen");
        assert_eq!(translator.len(), 1);
    }

    /// A cluster deleted and recreated under the same name while the watch
    /// was down comes back with a new uid and is replayed as Deleted + Added.
    #[test]
    fn test_recreated_cluster_is_deleted_then_added() {
        let mut translator = EventTranslator::new();
        translator.translate(Event::Apply(cluster_with_uid("zk", "1", "uid-a")));

        let mut events = translator.translate(Event::Init);
        let recreated = cluster_with_uid("zk", "9", "uid-b");
        events.extend(translator.translate(Event::InitApply(recreated)));
        events.extend(translator.translate(Event::InitDone));

        assert_eq!(
            kinds(&events),
            vec![
                ("zk".to_string(), EventKind::Deleted),
                ("zk".to_string(), EventKind::Added),
            ]
        );
        assert_eq!(events[0].resource.uid().as_deref(), Some("uid-a"));
        assert_eq!(events[1].resource.uid().as_deref(), Some("uid-b"));

        let updated = cluster_with_uid("zk", "10", "uid-b");
        let events = translator.translate(Event::Apply(updated));
        assert_eq!(kinds(&events), vec![("zk".to_string(), EventKind::Modified)]);
    }

    #[test]
    fn test_init_done_without_init_is_harmless() {
        let mut translator = EventTranslator::new();
        translator.translate(Event::Apply(cluster("zk", "1")));
        assert!(translator.translate(Event::InitDone).is_empty());
        assert_eq!(translator.len(), 1);
    }
}
