//! Static module registry: module kind → factory.
//!
//! Factories run at load time with the resolved config and the host. They
//! check the DOM contract and return an uninitialized instance; a missing
//! element fails that module only.

use crate::config::SiteConfig;
use crate::host::Host;
use crate::module::{ModuleError, ModuleKind, SiteModule};
use crate::modules::{
    callus::CallusModule, contact::ContactModule, gallery::GalleryModule,
    language::LanguageModule, loader::LoaderModule, navigation::NavigationModule,
    partners::PartnersModule, pricing::PricingModule,
};
use std::collections::HashMap;
use std::rc::Rc;

pub type ModuleFactory = Box<dyn Fn(&SiteConfig, &Host) -> Result<Rc<dyn SiteModule>, ModuleError>>;

pub struct ModuleRegistry {
    factories: HashMap<ModuleKind, ModuleFactory>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ModuleRegistry {
    /// No factories. Every build fails with [`ModuleError::Unregistered`].
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// One factory per built-in module.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry
            .register(ModuleKind::Loader, |config, host| {
                Ok(Rc::new(LoaderModule::new(config, host)?))
            })
            .register(ModuleKind::Language, |config, host| {
                Ok(Rc::new(LanguageModule::new(config, host)?))
            })
            .register(ModuleKind::Navigation, |config, host| {
                Ok(Rc::new(NavigationModule::new(config, host)?))
            })
            .register(ModuleKind::Gallery, |config, host| {
                Ok(Rc::new(GalleryModule::new(config, host)?))
            })
            .register(ModuleKind::Callus, |config, host| {
                Ok(Rc::new(CallusModule::new(config, host)?))
            })
            .register(ModuleKind::Partners, |config, host| {
                Ok(Rc::new(PartnersModule::new(config, host)?))
            })
            .register(ModuleKind::Contact, |config, host| {
                Ok(Rc::new(ContactModule::new(config, host)?))
            })
            .register(ModuleKind::Pricing, |config, host| {
                Ok(Rc::new(PricingModule::new(config, host)?))
            });
        registry
    }

    /// Add or replace the factory for `kind`.
    pub fn register(
        &mut self,
        kind: ModuleKind,
        factory: impl Fn(&SiteConfig, &Host) -> Result<Rc<dyn SiteModule>, ModuleError> + 'static,
    ) -> &mut Self {
        self.factories.insert(kind, Box::new(factory));
        self
    }

    pub fn contains(&self, kind: ModuleKind) -> bool {
        self.factories.contains_key(&kind)
    }

    pub fn build(
        &self,
        kind: ModuleKind,
        config: &SiteConfig,
        host: &Host,
    ) -> Result<Rc<dyn SiteModule>, ModuleError> {
        let factory = self
            .factories
            .get(&kind)
            .ok_or(ModuleError::Unregistered(kind))?;
        factory(config, host)
    }
}
