//! Screen implementations. Each screen is a top-level Component.

pub mod backups;
pub mod emails;
pub mod instructors;
pub mod list;
pub mod readers;
pub mod tags;

use rollcall_core::{FilePersistence, HttpSource};
use tokio::sync::mpsc::UnboundedSender;

use crate::action::Action;
use crate::component::Component;
use crate::screen::ScreenId;
use crate::session::Session;

use self::list::{CollectionView, ListScreen};

fn screen<V: CollectionView>(session: &Session, action_tx: &UnboundedSender<Action>) -> Box<dyn Component> {
    Box::new(ListScreen::<V, HttpSource<V::Item>>::new(
        session.source::<V::Item>(),
        session.view(),
        Some(FilePersistence::for_item::<V::Item>(session.views_dir())),
        action_tx.clone(),
    ))
}

/// Create screen components for the tab bar.
pub fn create_screens(session: &Session, action_tx: &UnboundedSender<Action>) -> Vec<(ScreenId, Box<dyn Component>)> {
    vec![
        (ScreenId::Instructors, screen::<instructors::InstructorsView>(session, action_tx)),
        (ScreenId::Emails, screen::<emails::EmailsView>(session, action_tx)),
        (ScreenId::Readers, screen::<readers::ReadersView>(session, action_tx)),
        (ScreenId::Tags, screen::<tags::TagsView>(session, action_tx)),
        (ScreenId::Backups, screen::<backups::BackupsView>(session, action_tx)),
    ]
}
